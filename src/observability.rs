//! Per-grabber counters

use serde::Serialize;

/// Running totals for one grabber, updated after every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickStats {
    /// Ticks started
    pub ticks: u64,
    /// Ticks that produced an image
    pub images: u64,
    /// Download failures downgraded by the ignore policy
    pub ignored_errors: u64,
    /// Images written by the save handler
    pub saved: u64,
    /// Ticks aborted by an error
    pub failures: u64,
}

impl TickStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn tick_started(&mut self) {
        self.ticks += 1;
        tracing::trace!(counter = "ticks", value = self.ticks, "Metric incremented");
    }

    pub(crate) fn image_received(&mut self) {
        self.images += 1;
        tracing::trace!(counter = "images", value = self.images, "Metric incremented");
    }

    pub(crate) fn error_ignored(&mut self) {
        self.ignored_errors += 1;
        tracing::trace!(counter = "ignored_errors", value = self.ignored_errors, "Metric incremented");
    }

    pub(crate) fn image_saved(&mut self) {
        self.saved += 1;
        tracing::trace!(counter = "saved", value = self.saved, "Metric incremented");
    }

    pub(crate) fn tick_failed(&mut self) {
        self.failures += 1;
        tracing::trace!(counter = "failures", value = self.failures, "Metric incremented");
    }
}
