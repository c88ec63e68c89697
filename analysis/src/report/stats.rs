/// Five number summary plus outliers of a single box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// `None` if there is no finite sample to summarize
    pub fn compute(samples: &[f64], whisker: f64) -> Option<Self> {
        let mut sorted = samples
            .iter()
            .copied()
            .filter(|value| value.is_finite())
            .collect::<Vec<_>>();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = percentile(&sorted, 25.0);
        let median = percentile(&sorted, 50.0);
        let q3 = percentile(&sorted, 75.0);
        let reach = whisker * (q3 - q1);
        let (low, high) = (q1 - reach, q3 + reach);

        let inside = sorted
            .iter()
            .copied()
            .filter(|value| (low..=high).contains(value));
        let whisker_low = inside.clone().next().unwrap_or(q1);
        let whisker_high = inside.last().unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|value| !(low..=high).contains(value))
            .collect();

        Some(Self {
            q1,
            median,
            q3,
            whisker_low,
            whisker_high,
            outliers,
        })
    }

    /// smallest and largest value drawn for this box
    pub fn extent(&self) -> (f64, f64) {
        self.outliers.iter().fold(
            (self.whisker_low, self.whisker_high),
            |(low, high), value| (low.min(*value), high.max(*value)),
        )
    }
}

/// percentile `p` (0..=100) of sorted data, interpolating linearly between ranks
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        len => {
            let rank = p / 100.0 * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let fraction = rank - lower as f64;

            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}
