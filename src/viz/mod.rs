//! Annotated price charts rendered to **SVG** or **PNG**.
//!
//! - Close line and moving averages repel labels along their drawn path
//! - All-time-high reference line, period low/high markers and a last-price
//!   label, all placed by the collision engine
//! - Optional volume bars on a twin surface sharing the date axis
//! - Locale-aware tick labels (`30,000` vs `30.000`), Office palette colors

pub mod artists;
pub mod legend;
pub mod text;
pub mod types;
pub mod util;

pub use types::{ChartOptions, ChartReport, DEFAULT_MOVING_AVERAGES, LabelPlacement};

use anyhow::{Result, anyhow};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;
use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;
use std::path::Path;
use std::sync::Once;

use crate::collision::{
    BBox, CoordTransform, ParticipationRegistry, Point, Shared, Surface, composed_surfaces,
    resolve_and_render, shared,
};
use crate::models::{PriceSeries, date_to_x, x_to_date};
use crate::stats::{all_time_high, extremes, moving_average};
use artists::{BarPatch, Band, HLine, HAlign, LineArtist, Marker, TextLabel};
use legend::LegendBox;
use text::{label_box_px, truncate_to_width};
use util::{choose_axis_scale, compute_left_label_area_px, format_price, map_locale, office_color};

/// One-time registration for a fallback "sans-serif" font when using the `ab_glyph` text path.
/// Required because `ab_glyph` doesn't discover OS fonts.
static INIT_FONTS: Once = Once::new();

fn ensure_fonts_registered() {
    INIT_FONTS.call_once(|| {
        let _ = plotters::style::register_font(
            "sans-serif",
            plotters::style::FontStyle::Normal,
            include_bytes!("../../assets/DejaVuSans.ttf"),
        );
    });
}

const MARGIN: u32 = 16;
const LABEL_FONT_PX: u32 = 12;
const MARKER_RADIUS_PX: f64 = 4.0;
/// Clear space between a label and the element it annotates.
const LABEL_GAP_PX: f64 = 6.0;
const MARKER_COLOR: RGBColor = RGBColor(192, 0, 0);
const ATH_COLOR: RGBColor = RGBColor(153, 115, 0);
const BAND_COLOR: RGBColor = RGBColor(91, 155, 213);

/// Render `series` with its annotations to `out_path` (SVG when the
/// extension is `.svg`, PNG otherwise).
pub fn plot_annotated<P: AsRef<Path>>(
    series: &PriceSeries,
    out_path: P,
    opts: &ChartOptions,
) -> Result<ChartReport> {
    series.validate()?;
    opts.collision.validate()?;
    ensure_fonts_registered();
    let out_path = out_path.as_ref();
    let path_string = out_path.to_string_lossy().into_owned();

    let report = if out_path.extension().and_then(|s| s.to_str()) == Some("svg") {
        let root = SVGBackend::new(path_string.as_str(), (opts.width, opts.height))
            .into_drawing_area();
        let report = draw_annotated(&root, series, opts)?;
        root.present().map_err(|e| anyhow!("{:?}", e))?;
        report
    } else {
        let root = BitMapBackend::new(path_string.as_str(), (opts.width, opts.height))
            .into_drawing_area();
        let report = draw_annotated(&root, series, opts)?;
        root.present().map_err(|e| anyhow!("{:?}", e))?;
        report
    };
    log::info!(
        "wrote {} ({} labels, {} moved beyond connector threshold)",
        out_path.display(),
        report.placements.len(),
        report.connectors
    );
    Ok(report)
}

/// Same as [`plot_annotated`] but returns the SVG document as a string.
pub fn render_svg_string(series: &PriceSeries, opts: &ChartOptions) -> Result<(String, ChartReport)> {
    series.validate()?;
    opts.collision.validate()?;
    ensure_fonts_registered();
    let mut buf = String::new();
    let report = {
        let root = SVGBackend::with_string(&mut buf, (opts.width, opts.height)).into_drawing_area();
        let report = draw_annotated(&root, series, opts)?;
        root.present().map_err(|e| anyhow!("{:?}", e))?;
        report
    };
    Ok((buf, report))
}

/// Chart elements kept alive for the duration of one render; the registry
/// only holds weak references to them.
#[derive(Default)]
struct Artists {
    lines: Vec<Shared<LineArtist>>,
    band: Option<Shared<Band>>,
    ath_line: Option<Shared<HLine>>,
    markers: Vec<Shared<Marker>>,
    bars: Vec<Shared<BarPatch>>,
    labels: Vec<Shared<TextLabel>>,
    legend: Option<Shared<LegendBox>>,
}

fn value_range(series: &PriceSeries) -> (f64, f64) {
    series
        .points
        .iter()
        .map(|p| p.close)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}

fn draw_annotated<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    series: &PriceSeries,
    opts: &ChartOptions,
) -> Result<ChartReport> {
    let (locale, dec_sep) = map_locale(&opts.locale);
    let fmt_price = |v: f64| format_price(v, locale, dec_sep);
    let pts = &series.points;
    let first = pts.first().ok_or_else(|| anyhow!("no data to plot"))?;
    let last = pts.last().ok_or_else(|| anyhow!("no data to plot"))?;

    // ----------------------------
    // 1) Ranges
    // ----------------------------
    let (mut x_min, mut x_max) = (date_to_x(first.date), date_to_x(last.date));
    if x_max - x_min < 1.0 {
        x_min -= 1.0;
        x_max += 1.0;
    }
    let (lo, hi) = value_range(series);
    let span = (hi - lo).max(hi.abs() * 0.02).max(1e-6);
    let show_volume = opts.volume && series.has_volume();
    // Room below the price line for the volume panel, above it for labels.
    let y_min = lo - span * if show_volume { 0.6 } else { 0.12 };
    let y_max = hi + span * 0.18;

    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;

    // ----------------------------
    // 2) Axes
    // ----------------------------
    let title = opts.title.clone().unwrap_or_else(|| series.symbol.clone());
    let title = truncate_to_width(&title, 22, opts.width.saturating_sub(2 * MARGIN));
    let left_px = compute_left_label_area_px(y_min, y_max, 8, 12, fmt_price);
    let x_label_fmt = |x: &f64| {
        x_to_date(*x)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    };
    let y_label_fmt = |v: &f64| fmt_price(*v);

    let mut chart = ChartBuilder::on(root)
        .margin(MARGIN)
        .caption(title, (FontFamily::SansSerif, 22))
        .set_label_area_size(LabelAreaPosition::Left, left_px)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| anyhow!("{:?}", e))?;
    chart
        .configure_mesh()
        .x_labels(6)
        .y_labels(8)
        .x_label_formatter(&x_label_fmt)
        .y_label_formatter(&y_label_fmt)
        .label_style((FontFamily::SansSerif, 12))
        .draw()
        .map_err(|e| anyhow!("{:?}", e))?;

    // Calibrate the engine transform on plotters' own mapping so collision
    // boxes line up with what the mesh shows.
    let p0 = chart.backend_coord(&(x_min, y_min));
    let p1 = chart.backend_coord(&(x_max, y_max));
    let plot_px = BBox::new(p0.0 as f64, p1.1 as f64, p1.0 as f64, p0.1 as f64);
    let price_ctx = CoordTransform::from_ranges(x_min..x_max, y_min..y_max, plot_px);
    let price = Surface::new("price", plot_px, price_ctx);

    // ----------------------------
    // 3) Artists and their roles
    // ----------------------------
    let mut registry = ParticipationRegistry::new();
    let mut art = Artists::default();
    let label_half_h = label_box_px("0", LABEL_FONT_PX).1 / 2.0;
    let mut legend_items: Vec<(String, RGBColor)> = Vec::new();

    let close_pts: Vec<Point> = pts
        .iter()
        .map(|p| Point::new(date_to_x(p.date), p.close))
        .collect();
    let close = shared(LineArtist::new("Close", close_pts, office_color(0), 2));
    registry.register_line_path(&price, &close);
    legend_items.push((series.symbol.clone(), office_color(0)));
    art.lines.push(close);

    for (i, &window) in opts.moving_averages.iter().enumerate() {
        let ma = moving_average(series, window)?;
        if ma.len() < 2 {
            log::debug!("skipping MA {window}: only {} value(s)", ma.len());
            continue;
        }
        let color = office_color(i + 1);
        let line = shared(LineArtist::new(
            format!("MA {window}"),
            ma.iter().map(|(d, v)| Point::new(date_to_x(*d), *v)).collect(),
            color,
            1,
        ));
        registry.register_line_path(&price, &line);
        legend_items.push((format!("MA {window}"), color));
        art.lines.push(line);
    }

    if opts.recent_window > 0 && pts.len() > 1 {
        let start = pts.len().saturating_sub(opts.recent_window);
        let band = shared(Band {
            x_from: date_to_x(pts[start].date),
            x_to: x_max,
            y_lo: y_min,
            y_hi: y_max,
            color: BAND_COLOR,
        });
        registry.register_passive(&price, &band);
        art.band = Some(band);
    }

    if let Some(ath) = all_time_high(series) {
        let line = shared(HLine {
            y: ath.close,
            x_from: x_min,
            x_to: x_max,
            color: ATH_COLOR,
            width: 1,
            dashed: true,
        });
        registry.register_fixed(&price, &line);
        art.ath_line = Some(line);
        // Left end, just above the line; the legend holds the top-right corner.
        let label = shared(
            TextLabel::new(
                format!("ATH {}", fmt_price(ath.close)),
                Point::new(x_min, ath.close),
                LABEL_FONT_PX,
            )
            .aligned(HAlign::Left)
            .with_offset(4.0, -(label_half_h + LABEL_GAP_PX))
            .colored(ATH_COLOR),
        );
        registry.register_moveable(&price, &label);
        art.labels.push(label);
    }

    if let Some((low, high)) = extremes(series) {
        let mid_x = (x_min + x_max) / 2.0;
        // No series runs below the low or above the high, so each label
        // starts on the free side of its marker.
        for (tag, p, side) in [("Low", low, 1.0), ("High", high, -1.0)] {
            let at = Point::new(date_to_x(p.date), p.close);
            let marker = shared(Marker {
                at,
                radius_px: MARKER_RADIUS_PX,
                color: MARKER_COLOR,
            });
            registry.register_fixed(&price, &marker);
            art.markers.push(marker);

            let (align, dx) = if at.x > mid_x {
                (HAlign::Right, -8.0)
            } else {
                (HAlign::Left, 8.0)
            };
            let label = shared(
                TextLabel::new(
                    format!("{tag} {} ({})", fmt_price(p.close), p.date),
                    at,
                    LABEL_FONT_PX,
                )
                .aligned(align)
                .with_offset(dx, side * (label_half_h + MARKER_RADIUS_PX + LABEL_GAP_PX))
                .colored(MARKER_COLOR),
            );
            registry.register_moveable(&price, &label);
            art.labels.push(label);
        }
    }

    let last_label = shared(
        TextLabel::new(
            format!("Last {}", fmt_price(last.close)),
            Point::new(date_to_x(last.date), last.close),
            LABEL_FONT_PX,
        )
        .aligned(HAlign::Right)
        .with_offset(-6.0, 0.0)
        .colored(office_color(0)),
    );
    registry.register_moveable(&price, &last_label);
    art.labels.push(last_label);

    // Volume lives on a twin surface; bars become obstacles through
    // patch auto-detection only.
    let volume = if show_volume {
        let vmax = pts
            .iter()
            .filter_map(|p| p.volume)
            .fold(0.0f64, f64::max)
            .max(1.0);
        // Bars use the bottom fifth of the plot, below the lowest price label.
        let vol_ctx = CoordTransform::from_ranges(x_min..x_max, 0.0..vmax * 5.0, plot_px);
        let twin = price.twin("volume", vol_ctx);
        let half_width = ((x_max - x_min) / pts.len() as f64 * 0.4).max(0.1);
        for p in pts {
            let Some(v) = p.volume else { continue };
            let bar = shared(BarPatch {
                x: date_to_x(p.date),
                half_width,
                value: v,
                color: office_color(2),
            });
            twin.add_patch(&bar);
            art.bars.push(bar);
        }
        let (scale, word) = choose_axis_scale(vmax);
        let name = if scale > 1.0 {
            format!("Volume ({word})")
        } else {
            "Volume".to_string()
        };
        legend_items.push((name, office_color(2)));
        Some(twin)
    } else {
        None
    };

    let mut legend_box = LegendBox::new(Point::default(), legend_items, 12);
    legend_box.place_top_right(&plot_px, 8.0);
    let legend_box = shared(legend_box);
    registry.register_fixed(&price, &legend_box);
    art.legend = Some(legend_box);

    // ----------------------------
    // 4) Background layers
    // ----------------------------
    if let Some(band) = &art.band {
        band.borrow().draw(root, &price_ctx)?;
    }
    if let Some(twin) = &volume {
        let vol_ctx = twin.transform();
        for bar in &art.bars {
            bar.borrow().draw(root, &vol_ctx)?;
        }
    }
    for line in &art.lines {
        line.borrow().draw(root, &price_ctx)?;
    }
    if let Some(line) = &art.ath_line {
        line.borrow().draw(root, &price_ctx)?;
    }
    for marker in &art.markers {
        marker.borrow().draw(root, &price_ctx)?;
    }

    // ----------------------------
    // 5) Resolve labels, then draw them on top
    // ----------------------------
    let surfaces = composed_surfaces(&price);
    let outcome = resolve_and_render(root, &registry, &surfaces, &opts.collision, opts.debug)?;

    if let Some(legend) = &art.legend {
        legend.borrow().draw(root)?;
    }
    let mut placements = Vec::with_capacity(art.labels.len());
    for label in &art.labels {
        let label = label.borrow();
        label.draw(root, &price_ctx)?;
        placements.push(label.placement(&price_ctx));
    }

    Ok(ChartReport {
        resolve: outcome.report,
        placements,
        connectors: outcome.connectors.len(),
        connector_lines: outcome.connectors,
    })
}
