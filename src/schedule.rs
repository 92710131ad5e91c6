use std::thread;
use std::time::Duration;
use tracing::info;

/// Call `tick` once, or forever with `period` between the end of one call and
/// the start of the next.
///
/// A zero `period` means run once. The first error returned by `tick` stops
/// the loop and is passed through; nothing is retried at this level.
pub fn run_on_schedule<E>(
    period: Duration,
    mut tick: impl FnMut() -> Result<(), E>,
) -> Result<(), E> {
    loop {
        tick()?;
        if period.is_zero() {
            return Ok(());
        }
        info!(minutes = period.as_secs() / 60, "next run scheduled");
        thread::sleep(period);
    }
}
