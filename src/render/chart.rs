use crate::predict::RegionProjection;
use crate::prelude::*;
use plotters::prelude::*;
use std::path::Path;
use unidecode::unidecode;

pub const CHART_SIZE: (u32, u32) = (1100, 650);
const GREY: RGBColor = RGBColor(0x80, 0x80, 0x80);
const BAR: f64 = 0.27;

/// Grouped bars for confirmed/deaths/projected counts with the death and
/// growth ratios on a secondary axis.
pub fn render_top_chart(top: &[RegionProjection], path: &Path, size: (u32, u32)) -> Result<()> {
    if top.is_empty() {
        bail!("no regions to chart");
    }

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let n = top.len() as f64;
    let case_max = top
        .iter()
        .map(|region| region.confirmed.max(region.projected))
        .fold(0.0, f64::max)
        .max(1.0)
        * 1.15;
    let ratio_max = top
        .iter()
        .map(|region| region.death_ratio.max(region.growth_rate))
        .fold(0.0, f64::max)
        .max(1e-6)
        * 1.25;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Top regions by confirmed cases, with projection",
            ("sans-serif", 22),
        )
        .margin(12)
        .x_label_area_size(70)
        .y_label_area_size(80)
        .right_y_label_area_size(60)
        .build_cartesian_2d(0f64..n, 0f64..case_max)?
        .set_secondary_coord(0f64..n, 0f64..ratio_max);

    let labels: Vec<String> = top
        .iter()
        .map(|region| unidecode(&region.region))
        .collect();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(top.len())
        .x_label_formatter(&|x| {
            let idx = (x.floor() as usize).min(labels.len() - 1);
            labels[idx].clone()
        })
        .x_desc("regions")
        .y_desc("cases")
        .draw()?;
    chart.configure_secondary_axes().y_desc("ratio").draw()?;

    chart
        .draw_series(top.iter().enumerate().map(|(i, region)| {
            let x = i as f64 + 0.06;
            Rectangle::new([(x, 0.0), (x + BAR, region.confirmed)], BLUE.filled())
        }))?
        .label("Confirmed")
        .legend(|(x, y)| Rectangle::new([(x, y - 4), (x + 10, y + 4)], BLUE.filled()));
    chart
        .draw_series(top.iter().enumerate().map(|(i, region)| {
            let x = i as f64 + 0.06 + BAR;
            Rectangle::new([(x, 0.0), (x + BAR, region.deaths)], GREY.filled())
        }))?
        .label("Deaths")
        .legend(|(x, y)| Rectangle::new([(x, y - 4), (x + 10, y + 4)], GREY.filled()));
    chart
        .draw_series(top.iter().enumerate().map(|(i, region)| {
            let x = i as f64 + 0.06 + 2.0 * BAR;
            Rectangle::new([(x, 0.0), (x + BAR, region.projected)], RED.filled())
        }))?
        .label("Projected")
        .legend(|(x, y)| Rectangle::new([(x, y - 4), (x + 10, y + 4)], RED.filled()));

    chart
        .draw_secondary_series(LineSeries::new(
            top.iter()
                .enumerate()
                .map(|(i, region)| (i as f64 + 0.5, region.death_ratio)),
            &GREEN,
        ))?
        .label("Death ratio")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], &GREEN));
    chart
        .draw_secondary_series(LineSeries::new(
            top.iter()
                .enumerate()
                .map(|(i, region)| (i as f64 + 0.5, region.growth_rate)),
            &MAGENTA,
        ))?
        .label("Growth rate")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], &MAGENTA));

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(WHITE.mix(0.85))
        .draw()?;
    root.present()?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}
