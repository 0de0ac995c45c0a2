//! Terminal progress for batch runs.
//!
//! With the `progress` feature, [`RunProgress`] drives an `indicatif` bar whose message
//! shows the duration of the last row and a smoothed per-row average ([`IterTimer`]).
//! Without the feature every method is a no-op, so the pipeline calls it
//! unconditionally.
//!
//! The average is an exponential moving average:
//! `ema ← α·dt + (1 − α)·ema`, with `α ∈ (0, 1]`. The first tick initializes it.
#[cfg(feature = "progress")]
use std::time::{Duration, Instant};

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

/// Smoothing factor of the per-row average.
#[cfg(feature = "progress")]
const ROW_TIME_ALPHA: f64 = 0.2;

#[cfg(feature = "progress")]
pub(crate) struct IterTimer {
    last: Instant,
    ema_ns: f64,
    alpha: f64,
    count: u64,
}

#[cfg(feature = "progress")]
impl IterTimer {
    pub(crate) fn new(alpha: f64) -> Self {
        Self {
            last: Instant::now(),
            ema_ns: 0.0,
            alpha,
            count: 0,
        }
    }

    #[inline]
    pub(crate) fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now.duration_since(self.last);
        self.last = now;
        self.count += 1;

        let dt_ns = dt.as_nanos() as f64;
        self.ema_ns = if self.count == 1 {
            dt_ns
        } else {
            self.alpha * dt_ns + (1.0 - self.alpha) * self.ema_ns
        };
        dt
    }

    #[inline]
    pub(crate) fn avg(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.ema_ns as u64)
        }
    }
}

/// Format a duration as `"253µs"`, `"42ms"` or `"3.14s"`.
#[cfg(feature = "progress")]
#[inline]
pub(crate) fn fmt_dur(d: Duration) -> String {
    let us = d.as_micros();
    if us < 1_000 {
        format!("{us}µs")
    } else if d.as_millis() < 1_000 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.2}s", d.as_secs_f32())
    }
}

/// Progress display of one batch run.
pub(crate) struct RunProgress {
    #[cfg(feature = "progress")]
    bar: ProgressBar,
    #[cfg(feature = "progress")]
    timer: IterTimer,
}

#[cfg(feature = "progress")]
impl RunProgress {
    pub(crate) fn new(total_rows: usize) -> Self {
        let bar = ProgressBar::new((total_rows as u64).max(1));
        bar.set_style(
            ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} rows ({percent:>3}%) | ETA {eta_precise} | {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.enable_steady_tick(Duration::from_millis(200));
        RunProgress {
            bar,
            timer: IterTimer::new(ROW_TIME_ALPHA),
        }
    }

    pub(crate) fn tick(&mut self) {
        let last = self.timer.tick();
        self.bar.set_message(format!(
            "last: {}, avg: {}",
            fmt_dur(last),
            fmt_dur(self.timer.avg())
        ));
        self.bar.inc(1);
    }

    pub(crate) fn finish(&self) {
        self.bar.disable_steady_tick();
        self.bar.finish_and_clear();
    }
}

#[cfg(not(feature = "progress"))]
impl RunProgress {
    pub(crate) fn new(_total_rows: usize) -> Self {
        RunProgress {}
    }

    #[inline]
    pub(crate) fn tick(&mut self) {}

    #[inline]
    pub(crate) fn finish(&self) {}
}
