//! Per-batch and cumulative benchmark accounting.
//!
//! Turns wall-clock durations and CPU-tick deltas into rates: requests
//! per second, optionally bytes per second, and user/kernel CPU
//! percentage breakdowns for the cache and proxy. The degenerate-timing
//! guard lives here: a zero or negative elapsed time surfaces as `None`
//! rates, never as a division crash further up.

use ipcstress_common::CpuTimes;
use ipcstress_workload::{cycle_bytes, cycle_length};
use serde::Serialize;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::info;

/// CPU time a participant spent during one interval, in seconds.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CpuUsage {
    pub user_seconds: f64,
    pub kernel_seconds: f64,
}

impl CpuUsage {
    fn from_ticks(delta: CpuTimes, ticks_per_second: u64) -> Self {
        let tps = ticks_per_second as f64;
        Self {
            user_seconds: delta.user_ticks as f64 / tps,
            kernel_seconds: delta.system_ticks as f64 / tps,
        }
    }

    pub fn total_seconds(&self) -> f64 {
        self.user_seconds + self.kernel_seconds
    }

    fn accumulate(&mut self, other: &CpuUsage) {
        self.user_seconds += other.user_seconds;
        self.kernel_seconds += other.kernel_seconds;
    }

    /// Render `<secs>s <pct>% user, ... kernel, ... total` against an
    /// interval. Percentages are zero when the interval is degenerate.
    fn render(&self, elapsed_seconds: f64) -> String {
        let percent = |seconds: f64| {
            if elapsed_seconds > 0.0 {
                100.0 * seconds / elapsed_seconds
            } else {
                0.0
            }
        };
        format!(
            "{:.2}s {:.2}% user, {:.2}s {:.2}% kernel, {:.2}s {:.2}% total",
            self.user_seconds,
            percent(self.user_seconds),
            self.kernel_seconds,
            percent(self.kernel_seconds),
            self.total_seconds(),
            percent(self.total_seconds()),
        )
    }
}

/// Metrics computed at one batch boundary.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub request_count: u64,
    pub elapsed_seconds: f64,
    /// `None` when the elapsed time is degenerate.
    pub requests_per_second: Option<f64>,
    /// `None` when the batch's request count does not evenly cover the
    /// workload cycle (or when the elapsed time is degenerate).
    pub bytes_per_second: Option<f64>,
    pub cache: CpuUsage,
    pub proxy: CpuUsage,
}

/// Running totals over all batches of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub batches: u32,
    pub requests_done: u64,
    pub elapsed_seconds: f64,
    pub requests_per_second: Option<f64>,
    pub bytes_per_second: Option<f64>,
    pub cache: CpuUsage,
    pub proxy: CpuUsage,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut line = format!("Summary: {:.2}s", self.elapsed_seconds);
        if let Some(rps) = self.requests_per_second {
            write!(line, ", {:.2} rps", rps)?;
        }
        if let Some(bps) = self.bytes_per_second {
            write!(line, ", {:.0} bps", bps)?;
        }
        write!(
            f,
            "{}, cache: {}, proxy: {}",
            line,
            self.cache.render(self.elapsed_seconds),
            self.proxy.render(self.elapsed_seconds)
        )
    }
}

/// Accumulates benchmark state across the batches of one run.
#[derive(Debug)]
pub struct BenchmarkAccumulator {
    ticks_per_second: u64,
    request_target: u64,
    batches: u32,
    requests_done: u64,
    total_elapsed_seconds: f64,
    total_cache: CpuUsage,
    total_proxy: CpuUsage,
}

impl BenchmarkAccumulator {
    pub fn new(ticks_per_second: u64, request_target: u64) -> Self {
        Self {
            ticks_per_second,
            request_target,
            batches: 0,
            requests_done: 0,
            total_elapsed_seconds: 0.0,
            total_cache: CpuUsage::default(),
            total_proxy: CpuUsage::default(),
        }
    }

    pub fn batches(&self) -> u32 {
        self.batches
    }

    pub fn requests_done(&self) -> u64 {
        self.requests_done
    }

    /// Fold one finished batch into the running totals and report it.
    ///
    /// CPU deltas are `None` when the accounting read raced a process
    /// exit; that tick contributes zero CPU rather than failing the
    /// batch.
    pub fn on_batch_complete(
        &mut self,
        batch_request_count: u64,
        elapsed: Duration,
        cache_delta: Option<CpuTimes>,
        proxy_delta: Option<CpuTimes>,
    ) -> BatchResult {
        let elapsed_seconds = elapsed.as_secs_f64();
        let cache = CpuUsage::from_ticks(cache_delta.unwrap_or_default(), self.ticks_per_second);
        let proxy = CpuUsage::from_ticks(proxy_delta.unwrap_or_default(), self.ticks_per_second);

        self.batches += 1;
        self.requests_done += batch_request_count;
        self.total_elapsed_seconds += elapsed_seconds;
        self.total_cache.accumulate(&cache);
        self.total_proxy.accumulate(&proxy);

        let result = BatchResult {
            request_count: batch_request_count,
            elapsed_seconds,
            requests_per_second: rate(batch_request_count as f64, elapsed_seconds),
            bytes_per_second: byte_rate(batch_request_count, elapsed_seconds),
            cache,
            proxy,
        };

        let mut line = format!(
            "{}/{} in {:.2}s",
            self.requests_done, self.request_target, elapsed_seconds
        );
        if let Some(rps) = result.requests_per_second {
            let _ = write!(line, ", {:.2} rps", rps);
        }
        if let Some(bps) = result.bytes_per_second {
            let _ = write!(line, ", {:.0} bps", bps);
        }
        info!(
            "{}, cache: {}, proxy: {}",
            line,
            result.cache.render(elapsed_seconds),
            result.proxy.render(elapsed_seconds)
        );

        result
    }

    /// Whole-run summary, present only when more than one batch ran;
    /// a single batch's report already is the whole story.
    pub fn finalize(&self) -> Option<RunSummary> {
        if self.batches <= 1 {
            return None;
        }
        Some(RunSummary {
            batches: self.batches,
            requests_done: self.requests_done,
            elapsed_seconds: self.total_elapsed_seconds,
            requests_per_second: rate(self.requests_done as f64, self.total_elapsed_seconds),
            bytes_per_second: byte_rate(self.requests_done, self.total_elapsed_seconds),
            cache: self.total_cache,
            proxy: self.total_proxy,
        })
    }
}

fn rate(count: f64, elapsed_seconds: f64) -> Option<f64> {
    if elapsed_seconds > 0.0 {
        Some(count / elapsed_seconds)
    } else {
        None
    }
}

/// Bytes/sec is only exact when the request count evenly covers the
/// workload cycle; the client does not distribute a partial cycle
/// evenly, so a non-multiple count has an indeterminate byte total.
fn byte_rate(request_count: u64, elapsed_seconds: f64) -> Option<f64> {
    if request_count == 0 || request_count % cycle_length() != 0 {
        return None;
    }
    let bytes = (request_count / cycle_length()) * cycle_bytes();
    rate(bytes as f64, elapsed_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipcstress_workload::cycle_bytes;

    const TPS: u64 = 100;

    #[test]
    fn test_requests_per_second() {
        let mut acc = BenchmarkAccumulator::new(TPS, 110);
        let result = acc.on_batch_complete(110, Duration::from_secs(2), None, None);
        assert_eq!(result.requests_per_second, Some(55.0));
    }

    #[test]
    fn test_zero_elapsed_yields_no_rates() {
        let mut acc = BenchmarkAccumulator::new(TPS, 110);
        let result = acc.on_batch_complete(110, Duration::ZERO, None, None);
        assert_eq!(result.requests_per_second, None);
        assert_eq!(result.bytes_per_second, None);
        // The batch still counts toward the run totals.
        assert_eq!(acc.requests_done(), 110);
    }

    #[test]
    fn test_bytes_per_second_eligibility() {
        let mut acc = BenchmarkAccumulator::new(TPS, 225);
        // 110 requests = 11 full cycles: eligible.
        let result = acc.on_batch_complete(110, Duration::from_secs(1), None, None);
        assert_eq!(result.bytes_per_second, Some(11.0 * cycle_bytes() as f64));

        // 115 requests leaves a partial cycle: suppressed, rps intact.
        let result = acc.on_batch_complete(115, Duration::from_secs(1), None, None);
        assert_eq!(result.bytes_per_second, None);
        assert_eq!(result.requests_per_second, Some(115.0));
    }

    #[test]
    fn test_cpu_percentages() {
        let mut acc = BenchmarkAccumulator::new(TPS, 1000);
        // 50 user + 25 kernel ticks at 100 Hz over 1s: 0.5s/0.25s.
        let result = acc.on_batch_complete(
            1000,
            Duration::from_secs(1),
            Some(CpuTimes::new(50, 25)),
            Some(CpuTimes::new(10, 0)),
        );
        assert!((result.cache.user_seconds - 0.5).abs() < 1e-9);
        assert!((result.cache.kernel_seconds - 0.25).abs() < 1e-9);
        assert!((result.cache.total_seconds() - 0.75).abs() < 1e-9);
        assert!((result.proxy.user_seconds - 0.1).abs() < 1e-9);
        assert_eq!(result.proxy.kernel_seconds, 0.0);
    }

    #[test]
    fn test_missing_cpu_delta_counts_as_zero() {
        let mut acc = BenchmarkAccumulator::new(TPS, 10);
        let result = acc.on_batch_complete(10, Duration::from_secs(1), None, Some(CpuTimes::new(5, 5)));
        assert_eq!(result.cache.total_seconds(), 0.0);
        assert!((result.proxy.total_seconds() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_summary_requires_more_than_one_batch() {
        let mut acc = BenchmarkAccumulator::new(TPS, 1100);
        acc.on_batch_complete(1000, Duration::from_secs(1), None, None);
        assert!(acc.finalize().is_none());

        acc.on_batch_complete(100, Duration::from_secs(1), None, None);
        let summary = acc.finalize().expect("two batches produce a summary");
        assert_eq!(summary.batches, 2);
        assert_eq!(summary.requests_done, 1100);
        assert!((summary.elapsed_seconds - 2.0).abs() < 1e-9);
        // 1100 = 110 full cycles over the grand total: eligible.
        assert_eq!(
            summary.bytes_per_second,
            Some(110.0 * cycle_bytes() as f64 / 2.0)
        );
    }

    #[test]
    fn test_totals_accumulate_without_double_counting() {
        let mut acc = BenchmarkAccumulator::new(TPS, 2000);
        acc.on_batch_complete(
            1000,
            Duration::from_secs(2),
            Some(CpuTimes::new(100, 50)),
            Some(CpuTimes::new(20, 10)),
        );
        acc.on_batch_complete(
            1000,
            Duration::from_secs(2),
            Some(CpuTimes::new(100, 50)),
            Some(CpuTimes::new(20, 10)),
        );
        let summary = acc.finalize().unwrap();
        assert!((summary.cache.user_seconds - 2.0).abs() < 1e-9);
        assert!((summary.cache.kernel_seconds - 1.0).abs() < 1e-9);
        assert!((summary.proxy.total_seconds() - 0.6).abs() < 1e-9);
        assert!((summary.elapsed_seconds - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_display_format() {
        let mut acc = BenchmarkAccumulator::new(TPS, 20);
        acc.on_batch_complete(10, Duration::from_secs(1), None, None);
        acc.on_batch_complete(10, Duration::from_secs(1), None, None);
        let rendered = acc.finalize().unwrap().to_string();
        assert!(rendered.starts_with("Summary: 2.00s, 10.00 rps"));
        assert!(rendered.contains("bps"));
        assert!(rendered.contains("cache:"));
        assert!(rendered.contains("proxy:"));
    }
}
