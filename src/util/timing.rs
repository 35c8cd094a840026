use std::time::Instant;

/// Runs a stage and logs how long it took.
pub fn time_stage<T>(description: &str, stage: impl FnOnce() -> T) -> T {
    tracing::info!("{}..", description);
    let start = Instant::now();
    let value = stage();
    tracing::info!(
        "{} finished after {:.4}s",
        description,
        start.elapsed().as_secs_f64()
    );
    value
}
