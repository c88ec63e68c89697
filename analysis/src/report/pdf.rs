use super::{stats::BoxStats, AttributePage, ReportConfig, ReportError};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb,
};
use std::{fmt::Debug, fs::File, io::BufWriter, path::Path};
use tracing::debug;

const X_AXIS_LABEL: &str = "Motion planning algorithm";
const TICKS: usize = 5;
// width of an average Helvetica glyph relative to the font size, in mm per pt
const GLYPH_WIDTH: f32 = 0.5 * 0.3528;

/// Drawing area of a page in millimeters plus the mapped value range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub low: f64,
    pub high: f64,
}

impl Frame {
    pub fn new(config: &ReportConfig, range: (f64, f64)) -> Self {
        let (low, high) = padded(range);

        Self {
            left: 30.0,
            right: config.page_width as f32 - 15.0,
            bottom: 35.0,
            top: config.page_height as f32 - 25.0,
            low,
            high,
        }
    }

    pub fn y(&self, value: f64) -> f32 {
        let fraction = ((value - self.low) / (self.high - self.low)) as f32;

        self.bottom + fraction * (self.top - self.bottom)
    }

    /// center of box `index` out of `count`
    pub fn x(&self, index: usize, count: usize) -> f32 {
        self.left + (index as f32 + 0.5) * self.slot(count)
    }

    fn slot(&self, count: usize) -> f32 {
        (self.right - self.left) / count.max(1) as f32
    }

    pub fn ticks(&self) -> Vec<f64> {
        (0..TICKS)
            .map(|tick| self.low + (self.high - self.low) * tick as f64 / (TICKS - 1) as f64)
            .collect()
    }
}

/// value range covered by all boxes of a page
pub fn value_range(stats: &[Option<BoxStats>]) -> Option<(f64, f64)> {
    stats
        .iter()
        .flatten()
        .map(BoxStats::extent)
        .reduce(|(low, high), (other_low, other_high)| (low.min(other_low), high.max(other_high)))
}

fn padded(range: (f64, f64)) -> (f64, f64) {
    let (low, high) = range;

    if high > low {
        let margin = (high - low) * 0.05;
        (low - margin, high + margin)
    } else {
        let margin = if low == 0.0 { 1.0 } else { low.abs() * 0.1 };
        (low - margin, high + margin)
    }
}

pub fn format_tick(value: f64) -> String {
    if value != 0.0 && (value.abs() >= 1e5 || value.abs() < 1e-3) {
        format!("{value:.2e}")
    } else {
        let text = format!("{value:.3}");
        text.trim_end_matches('0').trim_end_matches('.').to_owned()
    }
}

pub fn render(
    pages: &[AttributePage],
    path: &Path,
    config: &ReportConfig,
) -> Result<(), ReportError> {
    let (width, height) = (Mm(config.page_width as f32), Mm(config.page_height as f32));
    let (document, first_page, first_layer) =
        PdfDocument::new("Benchmark box plots", width, height, "plot");
    let font = document
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;

    let mut first = Some((first_page, first_layer));
    for page in pages {
        let (page_index, layer_index) = match first.take() {
            Some(indices) => indices,
            None => document.add_page(width, height, "plot"),
        };
        let layer = document.get_page(page_index).get_layer(layer_index);

        draw_page(&layer, &font, page, config);
    }

    let file = File::create(path)?;
    document
        .save(&mut BufWriter::new(file))
        .map_err(pdf_error)?;

    Ok(())
}

fn pdf_error<E: Debug>(error: E) -> ReportError {
    ReportError::Pdf(format!("{error:?}"))
}

fn draw_page(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    page: &AttributePage,
    config: &ReportConfig,
) {
    let stats = page
        .series
        .iter()
        .map(|series| BoxStats::compute(&series.samples, config.whisker))
        .collect::<Vec<_>>();
    let frame = Frame::new(config, value_range(&stats).unwrap_or((0.0, 1.0)));
    let count = page.series.len();

    debug!(attribute = %page.attribute, frame = ?frame, "Drawing page");

    // grid and y axis ticks
    layer.set_outline_thickness(0.2);
    layer.set_outline_color(grey());
    for tick in frame.ticks() {
        let y = frame.y(tick);
        segment(layer, (frame.left, y), (frame.right, y));
        text(layer, font, &format_tick(tick), 8.0, frame.left - 2.0, y - 1.0, Align::Right);
    }

    layer.set_outline_color(black());
    layer.set_outline_thickness(0.6);
    rectangle(layer, (frame.left, frame.bottom), (frame.right, frame.top));

    for (index, (series, stats)) in page.series.iter().zip(stats.iter()).enumerate() {
        let x = frame.x(index, count);
        text(layer, font, &series.label, 8.0, x, frame.bottom - 6.0, Align::Center);

        if let Some(stats) = stats {
            draw_box(layer, &frame, x, frame.slot(count) * 0.25, stats);
        }
    }

    if let Some(annotations) = page.annotations() {
        for (index, annotation) in annotations.iter().enumerate() {
            let x = frame.x(index, count);
            text(layer, font, annotation, 8.0, x, frame.top - 5.0, Align::Center);
        }
    }

    text(
        layer,
        font,
        X_AXIS_LABEL,
        11.0,
        (frame.left + frame.right) / 2.0,
        frame.bottom - 16.0,
        Align::Center,
    );
    text(layer, font, &page.axis_label(), 11.0, frame.left, frame.top + 6.0, Align::Left);
}

fn draw_box(layer: &PdfLayerReference, frame: &Frame, x: f32, half_width: f32, stats: &BoxStats) {
    let (left, right) = (x - half_width, x + half_width);
    let (q1, q3) = (frame.y(stats.q1), frame.y(stats.q3));

    rectangle(layer, (left, q1), (right, q3));
    segment(layer, (left, frame.y(stats.median)), (right, frame.y(stats.median)));

    // whiskers with caps at half the box width
    for (end, edge) in [(stats.whisker_low, q1), (stats.whisker_high, q3)] {
        let y = frame.y(end);
        segment(layer, (x, edge), (x, y));
        segment(layer, (x - half_width / 2.0, y), (x + half_width / 2.0, y));
    }

    for outlier in stats.outliers.iter() {
        let y = frame.y(*outlier);
        segment(layer, (x - 1.2, y), (x + 1.2, y));
        segment(layer, (x, y - 1.2), (x, y + 1.2));
    }
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

fn text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    text: &str,
    size: f32,
    x: f32,
    y: f32,
    align: Align,
) {
    let width = text.chars().count() as f32 * size * GLYPH_WIDTH;
    let x = match align {
        Align::Left => x,
        Align::Center => x - width / 2.0,
        Align::Right => x - width,
    };

    layer.use_text(text, size, Mm(x), Mm(y), font);
}

fn segment(layer: &PdfLayerReference, from: (f32, f32), to: (f32, f32)) {
    layer.add_line(Line {
        points: vec![(point(from), false), (point(to), false)],
        is_closed: false,
    });
}

fn rectangle(layer: &PdfLayerReference, lower_left: (f32, f32), upper_right: (f32, f32)) {
    let (left, bottom) = lower_left;
    let (right, top) = upper_right;

    layer.add_line(Line {
        points: vec![
            (point((left, bottom)), false),
            (point((right, bottom)), false),
            (point((right, top)), false),
            (point((left, top)), false),
        ],
        is_closed: true,
    });
}

fn point((x, y): (f32, f32)) -> Point {
    Point::new(Mm(x), Mm(y))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn grey() -> Color {
    Color::Rgb(Rgb::new(0.83, 0.83, 0.83, None))
}
