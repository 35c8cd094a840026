mod data {
    pub mod dataset;
    pub mod ingest;
}
mod predict;
mod prelude;
mod region {
    pub mod alias;
    pub mod discover;
    pub mod matcher;
}
mod render {
    pub mod animate;
    pub mod chart;
    pub mod choropleth;
    pub mod projection;
}
mod shape {
    pub mod source;
}
mod util {
    pub mod timing;
}

use chrono::{Local, NaiveDate};
use clap::Parser;
use data::dataset::{CaseDataset, TargetField};
use prelude::*;
use region::alias::AliasTable;
use region::discover;
use region::matcher::{self, DiscoveryMode};
use render::animate::{self, AnimationOptions};
use render::chart;
use render::choropleth::{self, FrameData, FRAME_SIZE};
use shape::source::ShapeSource;
use std::collections::HashSet;
use std::path::PathBuf;
use util::timing::time_stage;

#[derive(Parser, Debug)]
#[command(name = "casemap", about = "Regional case-count choropleth rendering")]
struct Args {
    /// World time-series CSV
    #[arg(long, default_value = "covid-19-data/data/time-series-19-covid-combined.csv")]
    world_data: PathBuf,
    /// US time-series CSV
    #[arg(long, default_value = "covid-19-data/data/us.csv")]
    usa_data: PathBuf,
    /// Folder holding the per-level <resource>.geojson exports
    #[arg(long, default_value = "shapefiles")]
    shapefiles: PathBuf,
    /// Granularity level: 0 = country, 1 = state/province
    #[arg(long, default_value_t = 0)]
    level: u8,
    /// Date to render (YYYY-MM-DD); the nearest prior recorded date is used.
    /// Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Alias-table JSON overriding the built-in curated table
    #[arg(long)]
    alias_table: Option<PathBuf>,
    /// Choropleth output image
    #[arg(long, default_value = "map.png")]
    map_output: PathBuf,
    /// Also render the top-10 projection chart to this path
    #[arg(long)]
    chart_output: Option<PathBuf>,
    /// Render one frame per recorded date and assemble this video
    #[arg(long)]
    animate: Option<PathBuf>,
    /// Frame directory used by --animate
    #[arg(long, default_value = "frames")]
    frames_dir: PathBuf,
    /// Frames per second for --animate
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Re-render outputs even when they already exist
    #[arg(long)]
    overwrite: bool,
    /// Log alias-table candidates for unmatched regions instead of failing
    #[arg(long)]
    discover: bool,
    /// Print the attributes of every shape referencing this name, then exit
    #[arg(long)]
    inspect: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();
    run(Args::parse())
}

fn run(args: Args) -> Result<()> {
    let source = ShapeSource::new(&args.shapefiles);

    if let Some(region) = &args.inspect {
        let (_, shapes) = source.load_level(args.level)?;
        let hits = discover::inspect_alias_candidates(&shapes, region);
        tracing::info!("{} candidate shapes reference '{}'", hits, region);
        return Ok(());
    }

    let dataset = time_stage("Reading dataset", || {
        CaseDataset::load(&args.world_data, &args.usa_data)
    })?;
    let aliases = match &args.alias_table {
        Some(path) => AliasTable::from_json_file(path)?,
        None => AliasTable::builtin(args.level),
    };
    let reverse = aliases.reverse_index();

    let (level_spec, shapes) = source.load_level(args.level)?;
    let regions = dataset.locations_at_level(args.level)?;
    let known: HashSet<String> = regions.iter().cloned().collect();
    let discovery = if args.discover {
        DiscoveryMode::Automated
    } else {
        DiscoveryMode::Off
    };

    let patches = time_stage("Matching regions to shapes", || {
        let index =
            matcher::build_shape_index(&shapes, level_spec.attribute_keys, &known, &reverse);
        matcher::drawable_patches(
            &regions,
            &index,
            &aliases,
            &shapes,
            level_spec.primary_key(),
            discovery,
        )
    })?;
    tracing::info!(
        "{} regions matched, {} background fragments",
        patches.matched.len(),
        patches.no_data.len()
    );

    let query = args.date.unwrap_or_else(|| Local::now().date_naive());
    let date = dataset
        .closest_prior_date(query)
        .context("dataset contains no dates")?;

    time_stage("Visualizing data", || -> Result<()> {
        let totals = dataset.aggregate(None, date, args.level, TargetField::Confirmed)?;
        let frame = FrameData {
            date,
            totals: &totals,
            max_record: dataset.max_field_at(date, TargetField::Confirmed),
        };
        choropleth::render_frame(&frame, &patches, &args.map_output, FRAME_SIZE)
    })?;
    tracing::info!("wrote {}", args.map_output.display());

    if let Some(output) = &args.animate {
        let opts = AnimationOptions {
            frames_dir: args.frames_dir.clone(),
            output: output.clone(),
            overwrite: args.overwrite,
            size: FRAME_SIZE,
            fps: args.fps,
        };
        time_stage("Rendering animation", || {
            animate::render_animation(&dataset, &patches, args.level, &opts)
        })?;
    }

    if let Some(chart_output) = &args.chart_output {
        let top = predict::top_regions_with_projection(&dataset, date, args.level, 10, 5.0)?;
        chart::render_top_chart(&top, chart_output, chart::CHART_SIZE)?;
    }

    Ok(())
}
