//! Batch throughput counters, dumped periodically at debug level.

use tracing::debug;

const DUMP_INTERVAL: u32 = 100;

/// Rolling per-process batch statistics.
///
/// Counters accumulate over a window of [`DUMP_INTERVAL`] batches, get
/// logged, then reset. Totals survive the window and are logged once more
/// when the process goes away.
pub(crate) struct BatchStats {
    pid: u32,
    window_batches: u32,
    calls_min: u32,
    calls_max: u32,
    bytes_min: u32,
    bytes_max: u32,
    total_batches: u64,
    total_calls: u64,
}

impl BatchStats {
    pub(crate) fn new(pid: u32) -> Self {
        Self {
            pid,
            window_batches: 0,
            calls_min: u32::MAX,
            calls_max: 0,
            bytes_min: u32::MAX,
            bytes_max: 0,
            total_batches: 0,
            total_calls: 0,
        }
    }

    /// Records one completed batch of `calls` calls and `bytes` stream bytes.
    pub(crate) fn batch(&mut self, calls: u32, bytes: u32) {
        self.window_batches += 1;
        self.calls_min = self.calls_min.min(calls);
        self.calls_max = self.calls_max.max(calls);
        self.bytes_min = self.bytes_min.min(bytes);
        self.bytes_max = self.bytes_max.max(bytes);
        self.total_batches += 1;
        self.total_calls += u64::from(calls);
        if self.window_batches == DUMP_INTERVAL {
            self.dump();
            self.reset_window();
        }
    }

    /// Logs the final totals. Called once at process teardown.
    pub(crate) fn finish(&mut self) {
        if self.window_batches > 0 {
            self.dump();
        }
        debug!(
            pid = self.pid,
            batches = self.total_batches,
            calls = self.total_calls,
            "process render statistics"
        );
    }

    fn dump(&self) {
        debug!(
            pid = self.pid,
            batches = self.window_batches,
            calls_min = self.calls_min,
            calls_max = self.calls_max,
            bytes_min = self.bytes_min,
            bytes_max = self.bytes_max,
            "batch window statistics"
        );
    }

    fn reset_window(&mut self) {
        self.window_batches = 0;
        self.calls_min = u32::MAX;
        self.calls_max = 0;
        self.bytes_min = u32::MAX;
        self.bytes_max = 0;
    }
}
