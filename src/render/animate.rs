use crate::data::dataset::{CaseDataset, TargetField};
use crate::prelude::*;
use crate::region::matcher::PatchSet;
use crate::render::choropleth::{self, FrameData};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub struct AnimationOptions {
    pub frames_dir: PathBuf,
    pub output: PathBuf,
    pub overwrite: bool,
    pub size: (u32, u32),
    pub fps: u32,
}

/// Renders one frame per recorded date and assembles them into a video.
/// Frames only read shared immutable state, so they render in parallel;
/// assembly consumes them strictly in date order.
pub fn render_animation(
    dataset: &CaseDataset,
    patches: &PatchSet,
    level: u8,
    opts: &AnimationOptions,
) -> Result<()> {
    if opts.output.exists() && !opts.overwrite {
        tracing::info!("{} exists. Skipping animation render.", opts.output.display());
        return Ok(());
    }
    fs::create_dir_all(&opts.frames_dir)
        .with_context(|| format!("failed to create {}", opts.frames_dir.display()))?;

    let dates = dataset.all_dates();
    let bar = ProgressBar::new(dates.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        "{msg} [{bar:25}] {percent:>3}%",
    )?);
    bar.set_message("rendering frames");

    dates
        .par_iter()
        .enumerate()
        .try_for_each(|(index, date)| -> Result<()> {
            let path = opts.frames_dir.join(format!("frame_{index:04}.png"));
            if opts.overwrite || !path.exists() {
                let totals = dataset.aggregate(None, *date, level, TargetField::Confirmed)?;
                let frame = FrameData {
                    date: *date,
                    totals: &totals,
                    max_record: dataset.max_field_at(*date, TargetField::Confirmed),
                };
                choropleth::render_frame(&frame, patches, &path, opts.size)?;
            }
            bar.inc(1);
            Ok(())
        })?;
    bar.finish_and_clear();

    encode_video(&opts.frames_dir, &opts.output, opts.fps)
}

fn encode_video(frames_dir: &Path, output: &Path, fps: u32) -> Result<()> {
    let pattern = frames_dir.join("frame_%04d.png");
    let status = Command::new("ffmpeg")
        .arg("-y")
        .arg("-framerate")
        .arg(fps.to_string())
        .arg("-i")
        .arg(&pattern)
        .args(["-pix_fmt", "yuv420p"])
        .arg(output)
        .status()
        .context("failed to launch ffmpeg")?;
    if !status.success() {
        bail!("ffmpeg exited with status {status}");
    }
    tracing::info!("wrote {}", output.display());
    Ok(())
}
