//! Free-token bootstrap.
//!
//! On session start the client makes sure it holds a bearer token.  When
//! none is stored it asks the auth service for a free one.  Failure is not
//! fatal: a banner goes up and queries go out without a token.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::banner::{BannerBoard, BannerKind};
use crate::client::RagBackend;
use crate::client_logger::{ClientLogger, Operation};
use crate::error::{Error, Result};
use crate::observability::{BOOTSTRAP_ACQUIRED, BOOTSTRAP_FAILURES, BOOTSTRAP_SKIPPED};
use crate::token_store::TokenStore;

/// What [`TokenBootstrapper::ensure_token`] found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A token was already stored; no request was made.
    AlreadyPresent,
    /// A fresh token was fetched and stored.
    Acquired,
}

/// Obtains and stores the free token.
pub struct TokenBootstrapper {
    backend: Arc<dyn RagBackend>,
    store: Arc<dyn TokenStore>,
    banners: Arc<BannerBoard>,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl TokenBootstrapper {
    /// Creates a new TokenBootstrapper.
    pub fn new(
        backend: Arc<dyn RagBackend>,
        store: Arc<dyn TokenStore>,
        banners: Arc<BannerBoard>,
    ) -> Self {
        Self {
            backend,
            store,
            banners,
            logger: None,
        }
    }

    /// Installs a logger.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Makes sure a token is stored, fetching a free one if needed.
    ///
    /// # Errors
    ///
    /// Returns the failure after raising a [`BannerKind::TokenBootstrap`]
    /// banner.  Nothing is stored on failure.
    pub async fn ensure_token(&self) -> Result<BootstrapOutcome> {
        if self.store.has() {
            BOOTSTRAP_SKIPPED.click();
            if let Some(logger) = &self.logger {
                logger.log_token_present();
            }
            return Ok(BootstrapOutcome::AlreadyPresent);
        }

        match self.acquire().await {
            Ok(()) => {
                BOOTSTRAP_ACQUIRED.click();
                if let Some(logger) = &self.logger {
                    logger.log_token_acquired();
                }
                Ok(BootstrapOutcome::Acquired)
            }
            Err(err) => {
                BOOTSTRAP_FAILURES.click();
                if let Some(logger) = &self.logger {
                    logger.log_error(Operation::TokenBootstrap, None, &err);
                }
                self.banners.raise(BannerKind::TokenBootstrap, &err);
                Err(err)
            }
        }
    }

    async fn acquire(&self) -> Result<()> {
        let free = self.backend.free_token().await?;
        let Some(token) = free.access_token() else {
            return Err(Error::token_bootstrap(
                "free-token response carried no access_token",
            ));
        };
        self.store.set(token)
    }

    /// Runs [`ensure_token`](Self::ensure_token) on a detached task.
    ///
    /// The caller may drop the handle; queries do not wait for it.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<Result<BootstrapOutcome>> {
        tokio::spawn(async move { self.ensure_token().await })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::chat::testing::ScriptedBackend;
    use crate::token_store::MemoryTokenStore;
    use crate::types::FreeToken;

    fn token(t: &str) -> FreeToken {
        FreeToken {
            access_token: Some(t.to_string()),
            token_type: None,
        }
    }

    fn fixture(
        store: MemoryTokenStore,
    ) -> (
        Arc<ScriptedBackend>,
        Arc<MemoryTokenStore>,
        Arc<BannerBoard>,
        TokenBootstrapper,
    ) {
        let backend = Arc::new(ScriptedBackend::new());
        let store = Arc::new(store);
        let banners = Arc::new(BannerBoard::new());
        let bootstrapper = TokenBootstrapper::new(backend.clone(), store.clone(), banners.clone());
        (backend, store, banners, bootstrapper)
    }

    #[tokio::test]
    async fn existing_token_skips_request() {
        let (backend, store, banners, bootstrapper) =
            fixture(MemoryTokenStore::with_token("kept"));

        let outcome = bootstrapper.ensure_token().await.unwrap();
        assert_eq!(outcome, BootstrapOutcome::AlreadyPresent);
        assert_eq!(backend.token_requests(), 0);
        assert_eq!(store.get().as_deref(), Some("kept"));
        assert!(banners.current().is_none());
    }

    #[tokio::test]
    async fn missing_token_is_fetched_and_stored() {
        let (backend, store, banners, bootstrapper) = fixture(MemoryTokenStore::new());
        backend.push_token(Ok(token("fresh")));

        let outcome = bootstrapper.ensure_token().await.unwrap();
        assert_eq!(outcome, BootstrapOutcome::Acquired);
        assert_eq!(backend.token_requests(), 1);
        assert_eq!(store.get().as_deref(), Some("fresh"));
        assert!(banners.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_raises_transient_banner() {
        let (backend, store, banners, bootstrapper) = fixture(MemoryTokenStore::new());
        backend.push_token(Err(Error::connection("refused", None)));

        let err = bootstrapper.ensure_token().await.unwrap_err();
        assert!(err.is_connection());
        assert!(!store.has());

        let banner = banners.current().unwrap();
        assert_eq!(banner.kind, BannerKind::TokenBootstrap);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(banners.current().is_none());
    }

    #[tokio::test]
    async fn missing_access_token_is_failure() {
        let (backend, store, banners, bootstrapper) = fixture(MemoryTokenStore::new());
        backend.push_token(Ok(FreeToken::default()));

        let err = bootstrapper.ensure_token().await.unwrap_err();
        assert!(err.is_token_bootstrap());
        assert!(!store.has());
        assert_eq!(
            banners.current().map(|b| b.kind),
            Some(BannerKind::TokenBootstrap)
        );
    }

    #[tokio::test]
    async fn spawned_bootstrap_completes() {
        let (backend, store, _banners, bootstrapper) = fixture(MemoryTokenStore::new());
        backend.push_token(Ok(token("spawned")));

        let handle = Arc::new(bootstrapper).spawn();
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome, BootstrapOutcome::Acquired);
        assert_eq!(store.get().as_deref(), Some("spawned"));
    }
}
