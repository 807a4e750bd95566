// src/fetch.rs
use chrono::Duration;

use crate::providers::PageSource;

/// How the cursor moves after a successful page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pagination {
    /// Request windows of at most `max_window` and step to the end of each.
    Window { max_window: Duration },
    /// Step one millisecond past the last returned record. An empty page
    /// moves on to the end of the requested window.
    Cursor { max_window: Option<Duration> },
}

impl Pagination {
    fn window_ms(&self) -> Option<i64> {
        match self {
            Pagination::Window { max_window } => Some(max_window.num_milliseconds().max(1)),
            Pagination::Cursor { max_window } => max_window.map(|w| w.num_milliseconds().max(1)),
        }
    }
}

/// Walks `[start, end)` page by page. The first failed page ends the walk and
/// whatever was collected so far is the result: there is no retry and no
/// backoff, and a short series is the only trace of the failure.
#[derive(Debug, Clone, Copy)]
pub struct PaginatedFetcher {
    pub pagination: Pagination,
}

impl PaginatedFetcher {
    pub fn new(pagination: Pagination) -> Self {
        Self { pagination }
    }

    pub fn windowed(max_window: Duration) -> Self {
        Self::new(Pagination::Window { max_window })
    }

    pub fn cursor(max_window: Option<Duration>) -> Self {
        Self::new(Pagination::Cursor { max_window })
    }

    /// Output is strictly increasing in time and within `[start_ms, end_ms)`.
    /// A repeated timestamp keeps its first record.
    pub async fn fetch<S: PageSource>(&self, source: &S, start_ms: i64, end_ms: i64) -> Vec<S::Record> {
        let mut out: Vec<S::Record> = Vec::new();
        let mut cursor = start_ms;
        let mut pages = 0usize;

        while cursor < end_ms {
            let window_end = match self.pagination.window_ms() {
                Some(w) => cursor.saturating_add(w).min(end_ms),
                None => end_ms,
            };

            let mut page = match source.fetch_page(cursor, window_end).await {
                Ok(p) => p,
                Err(err) => {
                    tracing::warn!(
                        source = %source.label(),
                        %err,
                        pages,
                        records = out.len(),
                        "page fetch failed; keeping partial series"
                    );
                    #[cfg(feature = "metrics")]
                    crate::metrics::FETCH_ABORTS_TOTAL.with_label_values(&[source.label().as_str()]).inc();
                    break;
                }
            };
            pages += 1;
            #[cfg(feature = "metrics")]
            crate::metrics::FETCH_PAGES_TOTAL.with_label_values(&[source.label().as_str()]).inc();

            page.sort_by_key(S::record_time_ms);
            let last_in_page = page.last().map(S::record_time_ms);
            let received = page.len();
            for r in page {
                let t = S::record_time_ms(&r);
                if t < start_ms || t >= end_ms {
                    continue;
                }
                if out.last().is_some_and(|prev| t <= S::record_time_ms(prev)) {
                    continue;
                }
                out.push(r);
            }
            tracing::debug!(source = %source.label(), cursor, window_end, received, "page");

            cursor = match (self.pagination, last_in_page) {
                (Pagination::Window { .. }, _) => window_end,
                (Pagination::Cursor { .. }, None) => window_end,
                (Pagination::Cursor { .. }, Some(last)) => last.saturating_add(1).max(cursor + 1),
            };
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// In-memory endpoint: serves `data` filtered by window, capped at `limit`,
    /// and fails on call number `fail_on`.
    struct Scripted {
        data: Vec<i64>,
        limit: usize,
        fail_on: Option<usize>,
        calls: Mutex<Vec<(i64, i64)>>,
    }

    impl Scripted {
        fn new(data: Vec<i64>) -> Self {
            Self { data, limit: usize::MAX, fail_on: None, calls: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl PageSource for Scripted {
        type Record = i64;

        fn label(&self) -> String {
            "scripted".into()
        }

        async fn fetch_page(&self, start_ms: i64, end_ms: i64) -> Result<Vec<i64>, ProviderError> {
            let n = {
                let mut calls = self.calls.lock();
                calls.push((start_ms, end_ms));
                calls.len()
            };
            if self.fail_on == Some(n) {
                return Err(ProviderError::Status { status: 500, body: "boom".into() });
            }
            // inclusive end, like the real endpoints
            Ok(self
                .data
                .iter()
                .copied()
                .filter(|t| *t >= start_ms && *t <= end_ms)
                .take(self.limit)
                .collect())
        }

        fn record_time_ms(record: &i64) -> i64 {
            *record
        }
    }

    #[tokio::test]
    async fn window_mode_covers_range_without_boundary_duplicates() {
        let src = Scripted::new((0..=10).map(|h| h * 10).collect());
        let f = PaginatedFetcher::windowed(Duration::milliseconds(30));
        let got = f.fetch(&src, 0, 100).await;

        assert_eq!(got, vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90]);
        assert_eq!(*src.calls.lock(), vec![(0, 30), (30, 60), (60, 90), (90, 100)]);
    }

    #[tokio::test]
    async fn cursor_mode_follows_last_record() {
        let mut src = Scripted::new(vec![5, 6, 7, 8, 9, 15]);
        src.limit = 2;
        let f = PaginatedFetcher::cursor(None);
        let got = f.fetch(&src, 0, 20).await;

        assert_eq!(got, vec![5, 6, 7, 8, 9, 15]);
        let calls = src.calls.lock().clone();
        assert_eq!(calls[0], (0, 20));
        assert_eq!(calls[1], (7, 20));
        assert_eq!(calls.last(), Some(&(16, 20)));
    }

    #[tokio::test]
    async fn cursor_mode_steps_over_empty_windows() {
        let src = Scripted::new(vec![2, 25]);
        let f = PaginatedFetcher::cursor(Some(Duration::milliseconds(10)));
        let got = f.fetch(&src, 0, 30).await;
        assert_eq!(got, vec![2, 25]);
    }

    #[tokio::test]
    async fn failure_on_first_page_yields_empty() {
        let mut src = Scripted::new(vec![1, 2, 3]);
        src.fail_on = Some(1);
        let got = PaginatedFetcher::windowed(Duration::milliseconds(2)).fetch(&src, 0, 10).await;
        assert!(got.is_empty());
        assert_eq!(src.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn failure_mid_walk_keeps_partial_and_stops() {
        let mut src = Scripted::new((0..10).collect());
        src.fail_on = Some(3);
        let got = PaginatedFetcher::windowed(Duration::milliseconds(2)).fetch(&src, 0, 10).await;
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
        assert_eq!(src.calls.lock().len(), 3);
    }

    #[tokio::test]
    async fn empty_or_inverted_range_makes_no_calls() {
        let src = Scripted::new(vec![1]);
        let f = PaginatedFetcher::windowed(Duration::hours(1));
        assert!(f.fetch(&src, 10, 10).await.is_empty());
        assert!(f.fetch(&src, 10, 5).await.is_empty());
        assert!(src.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn repeated_times_within_one_page_collapse() {
        let src = Scripted::new(vec![1, 1, 2, 2, 2, 7]);
        let got = PaginatedFetcher::windowed(Duration::milliseconds(5)).fetch(&src, 0, 10).await;
        assert_eq!(got, vec![1, 2, 7]);

        let got = PaginatedFetcher::cursor(None).fetch(&src, 0, 10).await;
        assert_eq!(got, vec![1, 2, 7]);
    }

    #[tokio::test]
    async fn out_of_range_records_are_dropped() {
        // endpoint ignores the window entirely
        struct Sloppy;
        #[async_trait]
        impl PageSource for Sloppy {
            type Record = i64;
            fn label(&self) -> String { "sloppy".into() }
            async fn fetch_page(&self, _s: i64, _e: i64) -> Result<Vec<i64>, ProviderError> {
                Ok(vec![-5, 3, 1, 50])
            }
            fn record_time_ms(r: &i64) -> i64 { *r }
        }
        let got = PaginatedFetcher::windowed(Duration::milliseconds(100)).fetch(&Sloppy, 0, 10).await;
        assert_eq!(got, vec![1, 3]);
    }
}
