//! Batch progress reporting.
//!
//! [`BatchProgress`] counts what happened to every input of a batch (fitted, kept as a
//! gap, skipped) in a [`BatchTally`] that worker threads update without locking. With the
//! `progress` feature it also drives an `indicatif` bar whose message is the running
//! tally; without it, only the tally is kept.
use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "progress")]
use std::time::Duration;

/// What one input contributed to the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// Fit converged, valid entry.
    Fitted,
    /// Fit failed, gap entry.
    Gap,
    /// No entry (load failure or time budget).
    Skipped,
}

/// Per-outcome input counts, shared by the workers of a batch.
#[derive(Debug, Default)]
pub struct BatchTally {
    fitted: AtomicUsize,
    gaps: AtomicUsize,
    skipped: AtomicUsize,
}

impl BatchTally {
    pub fn record(&self, outcome: InputOutcome) {
        let counter = match outcome {
            InputOutcome::Fitted => &self.fitted,
            InputOutcome::Gap => &self.gaps,
            InputOutcome::Skipped => &self.skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fitted(&self) -> usize {
        self.fitted.load(Ordering::Relaxed)
    }

    pub fn gaps(&self) -> usize {
        self.gaps.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> usize {
        self.fitted() + self.gaps() + self.skipped()
    }
}

impl fmt::Display for BatchTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fitted, {} gaps, {} skipped",
            self.fitted(),
            self.gaps(),
            self.skipped()
        )
    }
}

/// Progress over the inputs of one batch, safe to tick from worker threads.
pub struct BatchProgress {
    tally: BatchTally,
    #[cfg(feature = "progress")]
    bar: ProgressBar,
}

impl BatchProgress {
    #[cfg(feature = "progress")]
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} spectra | {per_sec} | ETA {eta} | {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.enable_steady_tick(Duration::from_millis(200));
        BatchProgress {
            tally: BatchTally::default(),
            bar,
        }
    }

    #[cfg(not(feature = "progress"))]
    pub fn new(_total: usize) -> Self {
        BatchProgress {
            tally: BatchTally::default(),
        }
    }

    /// Record one processed input.
    pub fn tick(&self, outcome: InputOutcome) {
        self.tally.record(outcome);
        #[cfg(feature = "progress")]
        {
            self.bar.set_message(self.tally.to_string());
            self.bar.inc(1);
        }
    }

    pub fn tally(&self) -> &BatchTally {
        &self.tally
    }

    pub fn finish(&self) {
        #[cfg(feature = "progress")]
        {
            self.bar.disable_steady_tick();
            self.bar.finish_and_clear();
        }
    }
}
