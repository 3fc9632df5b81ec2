//! Poll scheduler.
//!
//! Runs one ingestion step per interval tick, starting immediately, until the
//! shutdown future resolves. Failed steps are logged by the ingestor and never
//! end the loop.

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use super::ingest::Ingestor;
use crate::{GatorError, Result};

/// Drives the ingestor at a fixed interval.
#[derive(Debug, Clone)]
pub struct Scheduler {
    ingestor: Ingestor,
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler. The interval must be positive.
    pub fn new(ingestor: Ingestor, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(GatorError::Config(
                "poll interval must be positive".to_string(),
            ));
        }
        Ok(Self { ingestor, interval })
    }

    /// The poll interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until `shutdown` resolves and return the number of ticks run.
    ///
    /// Ticks stay on the schedule set by the first one. Ticks missed while a
    /// slow refresh runs are dropped. Shutdown is only observed between ticks;
    /// a tick in progress always finishes.
    pub async fn run<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut ticks: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Scheduler stopped after {} tick(s)", ticks);
                    return ticks;
                }
                _ = timer.tick() => {}
            }

            ticks += 1;
            self.ingestor.tick().await;
        }
    }
}

/// Parse a poll interval such as `30s`, `1m` or `1h30m`.
///
/// The input is one or more `<number><unit>` pairs; numbers may carry a
/// fraction and units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. The
/// total must be positive.
pub fn parse_interval(input: &str) -> Result<Duration> {
    let invalid = |reason: &str| GatorError::Config(format!("invalid interval {input:?}: {reason}"));

    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(invalid("empty"));
    }
    if rest.starts_with('-') {
        return Err(invalid("must be positive"));
    }
    rest = rest.strip_prefix('+').unwrap_or(rest);

    let mut total_nanos = 0f64;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..num_end];
        if number.is_empty() || number == "." {
            return Err(invalid("expected a number"));
        }
        let value: f64 = number.parse().map_err(|_| invalid("bad number"))?;

        let unit_end = rest[num_end..]
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .map_or(rest.len(), |i| num_end + i);
        let scale = match &rest[num_end..unit_end] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("unknown unit")),
        };

        total_nanos += value * scale;
        rest = &rest[unit_end..];
    }

    if !total_nanos.is_finite() || total_nanos >= u64::MAX as f64 {
        return Err(invalid("out of range"));
    }
    let duration = Duration::from_nanos(total_nanos.round() as u64);
    if duration.is_zero() {
        return Err(invalid("must be positive"));
    }
    Ok(duration)
}
