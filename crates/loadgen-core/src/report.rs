use crate::stats::{Category, MetricsSink};
use std::fmt;
use std::time::Duration;

const RULE_WIDTH: usize = 60;

/// Nearest-rank percentile of ascending `sorted` samples: index `floor(p * n)`,
/// clamped to the last sample. Returns 0.0 for an empty slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (p * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatencySummary {
    pub category: Category,
    pub count: usize,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl LatencySummary {
    /// `None` when there are no samples.
    pub fn from_samples(category: Category, samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();

        Some(Self {
            category,
            count,
            min_ms: sorted[0],
            mean_ms: sorted.iter().sum::<f64>() / count as f64,
            median_ms: percentile(&sorted, 0.50),
            p95_ms: percentile(&sorted, 0.95),
            p99_ms: percentile(&sorted, 0.99),
            max_ms: sorted[count - 1],
        })
    }
}

/// Final statistics of a run, computed once from the frozen sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub elapsed: Duration,
    pub total_requests: u64,
    pub errors: u64,
    /// Only categories with at least one sample, in submit/top/rank order.
    pub latencies: Vec<LatencySummary>,
}

impl Report {
    pub fn generate(sink: &MetricsSink, elapsed: Duration) -> Self {
        let latencies = Category::ALL
            .iter()
            .filter_map(|&c| LatencySummary::from_samples(c, sink.samples(c)))
            .collect();

        Self {
            elapsed,
            total_requests: sink.total_requests(),
            errors: sink.errors(),
            latencies,
        }
    }

    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_requests as f64 / secs
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        self.errors as f64 / self.total_requests.max(1) as f64
    }

    pub fn latency(&self, category: Category) -> Option<&LatencySummary> {
        self.latencies.iter().find(|l| l.category == category)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);

        writeln!(f)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "LOAD TEST RESULTS")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Duration:          {:.1}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "Total requests:    {}", format_thousands(self.total_requests))?;
        writeln!(f, "Errors:            {}", format_thousands(self.errors))?;
        writeln!(f, "Throughput:        {:.1} req/s", self.throughput())?;
        writeln!(f, "Error rate:        {:.2}%", self.error_rate() * 100.0)?;

        for l in &self.latencies {
            writeln!(f)?;
            writeln!(
                f,
                "── {} ({} requests) ──",
                l.category.label(),
                format_thousands(l.count as u64)
            )?;
            writeln!(f, "  Min:    {:.1}ms", l.min_ms)?;
            writeln!(f, "  Avg:    {:.1}ms", l.mean_ms)?;
            writeln!(f, "  Median: {:.1}ms", l.median_ms)?;
            writeln!(f, "  P95:    {:.1}ms", l.p95_ms)?;
            writeln!(f, "  P99:    {:.1}ms", l.p99_ms)?;
            writeln!(f, "  Max:    {:.1}ms", l.max_ms)?;
        }

        writeln!(f, "{rule}")
    }
}

/// `1234567` -> `1,234,567`
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_rank_percentiles() {
        let samples = [10.0, 20.0, 30.0, 40.0, 50.0];
        // p95: floor(0.95 * 5) = 4, p99: floor(0.99 * 5) = 4, median: floor(0.5 * 5) = 2
        assert_eq!(percentile(&samples, 0.95), 50.0);
        assert_eq!(percentile(&samples, 0.99), 50.0);
        assert_eq!(percentile(&samples, 0.50), 30.0);
    }

    #[test]
    fn test_percentile_unsorted_and_even() {
        // sorted: [1, 2, 3, 4]; median index floor(0.5 * 4) = 2 -> 3, no interpolation
        let s = LatencySummary::from_samples(Category::Rank, &[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(s.median_ms, 3.0);
        assert_eq!(s.p99_ms, 4.0);
        assert_eq!(percentile(&[7.0], 0.99), 7.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_summary_fields() {
        let s = LatencySummary::from_samples(Category::Top, &[50.0, 10.0, 40.0, 20.0, 30.0]).unwrap();
        assert_eq!(s.count, 5);
        assert_eq!(s.min_ms, 10.0);
        assert_eq!(s.mean_ms, 30.0);
        assert_eq!(s.median_ms, 30.0);
        assert_eq!(s.p95_ms, 50.0);
        assert_eq!(s.p99_ms, 50.0);
        assert_eq!(s.max_ms, 50.0);
        assert!(LatencySummary::from_samples(Category::Top, &[]).is_none());
    }

    #[test]
    fn test_empty_categories_are_omitted() {
        let mut sink = MetricsSink::new();
        sink.record(Category::Submit, Some(12.0), true);
        sink.record(Category::Rank, None, false);

        let report = Report::generate(&sink, Duration::from_secs(2));
        assert_eq!(report.latencies.len(), 1);
        assert!(report.latency(Category::Submit).is_some());
        assert!(report.latency(Category::Top).is_none());
        assert!(report.latency(Category::Rank).is_none());

        let text = report.to_string();
        assert!(text.contains("── Submit Score (1 requests) ──"));
        assert!(!text.contains("Get Top 10"));
        assert!(!text.contains("Get Rank"));
    }

    #[test]
    fn test_throughput_and_error_rate() {
        let mut sink = MetricsSink::new();
        for i in 0..10 {
            sink.record(Category::Top, Some(1.0), i != 0);
        }
        let report = Report::generate(&sink, Duration::from_secs(2));
        assert_eq!(report.throughput(), 5.0);
        assert_eq!(report.error_rate(), 0.1);

        let empty = Report::generate(&MetricsSink::new(), Duration::ZERO);
        assert_eq!(empty.throughput(), 0.0);
        assert_eq!(empty.error_rate(), 0.0);
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let mut sink = MetricsSink::new();
        for ms in [3.0, 1.0, 2.0] {
            sink.record(Category::Submit, Some(ms), true);
        }
        sink.record(Category::Top, Some(9.0), false);

        let elapsed = Duration::from_millis(1500);
        let first = Report::generate(&sink, elapsed);
        let second = Report::generate(&sink, elapsed);
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(first.to_string(), first.to_string());
    }

    #[test]
    fn test_render_layout() {
        let mut sink = MetricsSink::new();
        for ms in [10.0, 20.0, 30.0, 40.0, 50.0] {
            sink.record(Category::Rank, Some(ms), true);
        }
        let text = Report::generate(&sink, Duration::from_secs(1)).to_string();

        assert!(text.contains("LOAD TEST RESULTS"));
        assert!(text.contains("Duration:          1.0s"));
        assert!(text.contains("Total requests:    5"));
        assert!(text.contains("Throughput:        5.0 req/s"));
        assert!(text.contains("Error rate:        0.00%"));
        assert!(text.contains("── Get Rank (5 requests) ──"));
        assert!(text.contains("  Median: 30.0ms"));
        assert!(text.contains("  P95:    50.0ms"));
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(12_345), "12,345");
        assert_eq!(format_thousands(1_000_000), "1,000,000");
    }
}
