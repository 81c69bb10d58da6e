//! Lazily established, process-wide database connection.

use super::{ConnectError, DatabaseConnector, SessionStore};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Shared handle to the session store.
///
/// The first caller runs the connector; callers arriving while that attempt is
/// in flight wait for it instead of starting their own. A failed attempt
/// leaves the handle empty so the next caller tries again. Once connected the
/// handle stays connected.
#[derive(Clone)]
pub struct DatabaseHandle {
    inner: Arc<Inner>,
}

struct Inner {
    connector: Arc<dyn DatabaseConnector>,
    store: OnceCell<Arc<dyn SessionStore>>,
}

impl DatabaseHandle {
    pub fn new(connector: Arc<dyn DatabaseConnector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                store: OnceCell::new(),
            }),
        }
    }

    /// Ensure the connection exists and return the store.
    pub async fn connect(&self) -> Result<Arc<dyn SessionStore>, ConnectError> {
        self.inner
            .store
            .get_or_try_init(|| async {
                tracing::info!("Establishing database connection");
                let store = self.inner.connector.connect().await?;
                tracing::info!("Database connection established");
                Ok::<_, ConnectError>(store)
            })
            .await
            .cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.store.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemorySessionStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fails the first `failures` attempts, then succeeds.
    struct FlakyConnector {
        calls: AtomicUsize,
        failures: usize,
        delay: Duration,
    }

    impl FlakyConnector {
        fn new(failures: usize, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failures,
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DatabaseConnector for FlakyConnector {
        async fn connect(&self) -> Result<Arc<dyn SessionStore>, ConnectError> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if attempt < self.failures {
                return Err(ConnectError::Driver("timeout".into()));
            }
            Ok(Arc::new(InMemorySessionStore::new()))
        }
    }

    #[tokio::test]
    async fn connects_once_for_sequential_callers() {
        let connector = FlakyConnector::new(0, Duration::ZERO);
        let handle = DatabaseHandle::new(connector.clone());

        assert!(!handle.is_connected());
        handle.connect().await.unwrap();
        handle.connect().await.unwrap();

        assert!(handle.is_connected());
        assert_eq!(connector.calls(), 1);
    }

    #[tokio::test]
    async fn failure_is_propagated_and_retried() {
        let connector = FlakyConnector::new(1, Duration::ZERO);
        let handle = DatabaseHandle::new(connector.clone());

        let err = handle.connect().await.err().unwrap();
        assert_eq!(err.message(), "timeout");
        assert!(!handle.is_connected());

        handle.connect().await.unwrap();
        assert!(handle.is_connected());
        assert_eq!(connector.calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_first_callers_share_one_attempt() {
        let connector = FlakyConnector::new(0, Duration::from_millis(50));
        let handle = DatabaseHandle::new(connector.clone());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move { handle.connect().await.map(|_| ()) })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(connector.calls(), 1);
    }
}
