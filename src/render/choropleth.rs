use crate::prelude::*;
use crate::region::matcher::PatchSet;
use crate::render::projection::Viewport;
use chrono::NaiveDate;
use geo_types::Polygon as GeoPolygon;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

pub const FRAME_SIZE: (u32, u32) = (1280, 720);
pub const OCEAN: RGBColor = RGBColor(0x5D, 0x9B, 0xFF);
const BAR_WIDTH: u32 = 96;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Everything one frame needs from the dataset: the resolved date, per-region
/// totals at that date, and the largest single record as the log normalizer.
pub struct FrameData<'a> {
    pub date: NaiveDate,
    pub totals: &'a BTreeMap<String, f64>,
    pub max_record: f64,
}

pub fn render_frame(
    frame: &FrameData<'_>,
    patches: &PatchSet,
    path: &Path,
    size: (u32, u32),
) -> Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&OCEAN)?;
    let (map_area, bar_area) = root.split_horizontally(size.0 - BAR_WIDTH);
    let view = Viewport::world(size.0 - BAR_WIDTH, size.1);
    let log_max = normalizer(frame.max_record);

    // "No data" background first so matched regions overdraw any overlap.
    for fragment in &patches.no_data {
        draw_fragment(&map_area, &view, fragment, BLACK)?;
    }
    for (region, fragments) in &patches.matched {
        let total = frame.totals.get(region).copied().unwrap_or(0.0);
        let color = ramp_color(scale_value(total, log_max));
        for fragment in fragments {
            draw_fragment(&map_area, &view, fragment, color)?;
        }
    }

    draw_color_bar(&bar_area, log_max)?;
    let title = ("sans-serif", 18).into_font().color(&BLACK);
    map_area.draw(&Text::new(
        format!("Confirmed cases, {}", frame.date),
        (12, 10),
        title,
    ))?;
    root.present()?;
    Ok(())
}

/// Log-scale denominator; degenerate maxima render everything at ramp zero.
fn normalizer(max_record: f64) -> f64 {
    if max_record > 1.0 {
        max_record.ln()
    } else {
        1.0
    }
}

fn scale_value(total: f64, log_max: f64) -> f64 {
    if total > 0.0 {
        (total.ln() / log_max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn draw_fragment(
    area: &Area<'_>,
    view: &Viewport,
    fragment: &GeoPolygon<f64>,
    color: RGBColor,
) -> Result<()> {
    let ring: Vec<(i32, i32)> = fragment
        .exterior()
        .coords()
        .map(|coord| view.to_pixel(coord.x, coord.y))
        .collect();
    if ring.len() < 3 {
        return Ok(());
    }
    area.draw(&Polygon::new(ring.clone(), color.filled()))?;
    let mut outline = ring;
    outline.push(outline[0]);
    area.draw(&PathElement::new(outline, &BLACK))?;
    Ok(())
}

fn draw_color_bar(area: &Area<'_>, log_max: f64) -> Result<()> {
    let (_, height) = area.dim_in_pixel();
    let top = 40i32;
    let bottom = height as i32 - 40;
    let (x0, x1) = (10i32, 34i32);
    let span = (bottom - top).max(1);

    for i in 0..span {
        let t = 1.0 - i as f64 / span as f64;
        area.draw(&Rectangle::new(
            [(x0, top + i), (x1, top + i + 1)],
            ramp_color(t).filled(),
        ))?;
    }
    area.draw(&Rectangle::new([(x0, top), (x1, bottom)], &BLACK))?;

    let labels = ("sans-serif", 12).into_font().color(&BLACK);
    for t in [0.0, 0.5, 1.0] {
        let y = bottom - (t * span as f64) as i32;
        area.draw(&Text::new(
            format!("{:.0}", (t * log_max).exp()),
            (x1 + 6, y - 6),
            labels.clone(),
        ))?;
    }
    area.draw(&Text::new("cases", (x0, 16), labels))?;
    Ok(())
}

/// Sequential ramp from near-white to dark red over [0, 1].
pub fn ramp_color(t: f64) -> RGBColor {
    const STOPS: [(u8, u8, u8); 3] = [(255, 245, 240), (251, 106, 74), (103, 0, 13)];
    let t = t.clamp(0.0, 1.0) * (STOPS.len() - 1) as f64;
    let idx = (t.floor() as usize).min(STOPS.len() - 2);
    let local = t - idx as f64;
    let (r0, g0, b0) = STOPS[idx];
    let (r1, g1, b1) = STOPS[idx + 1];
    RGBColor(
        lerp(r0, r1, local),
        lerp(g0, g1, local),
        lerp(b0, b1, local),
    )
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_spans_white_to_dark_red() {
        assert_eq!(ramp_color(0.0), RGBColor(255, 245, 240));
        assert_eq!(ramp_color(1.0), RGBColor(103, 0, 13));
        // Out-of-range values clamp instead of wrapping.
        assert_eq!(ramp_color(-0.5), ramp_color(0.0));
        assert_eq!(ramp_color(7.0), ramp_color(1.0));
    }

    #[test]
    fn zero_totals_sit_at_ramp_zero() {
        let log_max = normalizer(1000.0);
        assert_eq!(scale_value(0.0, log_max), 0.0);
        assert_eq!(scale_value(1000.0, log_max), 1.0);
        let mid = scale_value(100.0, log_max);
        assert!(mid > 0.0 && mid < 1.0);
    }
}
