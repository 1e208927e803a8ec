// Page fetch abstraction and the scoped session guard.
//
// The pipeline never talks to the network directly: it is handed something
// implementing `PageFetcher`. A `Session` is a fetcher holding a resource
// that must be released exactly once; `ScopedSession` owns one and releases
// it when dropped, so every exit path (early `?` return, panic unwind, normal
// completion) closes it.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::table::{Table, TableError};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read tables from {url}: {source}")]
    Table { url: String, source: TableError },

    #[error("failed to open fetch session: {0}")]
    Open(String),

    #[error("fetch session already closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Retrieves page content for a URL. Timeouts and transport details belong
/// to the implementation; callers only see data or an error.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Every table on the page, in document order.
    async fn fetch_tables(&self, url: &str) -> Result<Vec<Table>, FetchError>;

    /// Fully rendered markup of the page.
    async fn fetch_rendered_page(&self, url: &str) -> Result<String, FetchError>;
}

/// A fetcher backed by a resource that must be released once.
pub trait Session: PageFetcher {
    fn close(&mut self);
}

// ---------------------------------------------------------------------------
// ScopedSession
// ---------------------------------------------------------------------------

/// Owns a `Session` for the duration of a run and closes it on drop.
pub struct ScopedSession<S: Session> {
    inner: Option<S>,
}

impl<S: Session> ScopedSession<S> {
    /// Open a session through `open` and take ownership of it.
    pub fn acquire<F>(open: F) -> Result<Self, FetchError>
    where
        F: FnOnce() -> Result<S, FetchError>,
    {
        let session = open()?;
        info!("fetch session acquired");
        Ok(Self {
            inner: Some(session),
        })
    }

    /// Release the session now instead of at end of scope.
    pub fn release(mut self) {
        self.close_inner();
    }

    fn close_inner(&mut self) {
        if let Some(mut session) = self.inner.take() {
            session.close();
            info!("fetch session released");
        }
    }

    fn session(&self) -> Result<&S, FetchError> {
        self.inner.as_ref().ok_or(FetchError::Closed)
    }
}

impl<S: Session> Drop for ScopedSession<S> {
    fn drop(&mut self) {
        self.close_inner();
    }
}

#[async_trait]
impl<S: Session> PageFetcher for ScopedSession<S> {
    async fn fetch_tables(&self, url: &str) -> Result<Vec<Table>, FetchError> {
        debug!(url, "fetch_tables");
        self.session()?.fetch_tables(url).await
    }

    async fn fetch_rendered_page(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "fetch_rendered_page");
        self.session()?.fetch_rendered_page(url).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSession {
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PageFetcher for CountingSession {
        async fn fetch_tables(&self, _url: &str) -> Result<Vec<Table>, FetchError> {
            Ok(vec![Table::default()])
        }

        async fn fetch_rendered_page(&self, url: &str) -> Result<String, FetchError> {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            })
        }
    }

    impl Session for CountingSession {
        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn open(closes: &Arc<AtomicUsize>) -> ScopedSession<CountingSession> {
        let closes = Arc::clone(closes);
        ScopedSession::acquire(|| Ok(CountingSession { closes })).unwrap()
    }

    #[tokio::test]
    async fn delegates_to_inner_session() {
        let closes = Arc::new(AtomicUsize::new(0));
        let scoped = open(&closes);
        assert_eq!(scoped.fetch_tables("x").await.unwrap().len(), 1);
        assert!(scoped.fetch_rendered_page("x").await.is_err());
    }

    #[test]
    fn closed_once_on_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let _scoped = open(&closes);
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_release_does_not_double_close() {
        let closes = Arc::new(AtomicUsize::new(0));
        let scoped = open(&closes);
        scoped.release();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closed_on_early_error_return() {
        fn run(closes: &Arc<AtomicUsize>) -> Result<(), FetchError> {
            let scoped = open(closes);
            let failed: Result<(), FetchError> = Err(FetchError::Open("boom".into()));
            failed?;
            drop(scoped);
            Ok(())
        }

        let closes = Arc::new(AtomicUsize::new(0));
        assert!(run(&closes).is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_open_yields_no_session() {
        let result: Result<ScopedSession<CountingSession>, _> =
            ScopedSession::acquire(|| Err(FetchError::Open("no driver".into())));
        assert!(matches!(result, Err(FetchError::Open(_))));
    }
}
