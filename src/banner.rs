//! Transient error banners.
//!
//! A [`BannerBoard`] shows at most one banner.  Raising a banner replaces the
//! current one; a banner disappears on its own once [`BANNER_TTL`] has passed
//! or when it is dismissed.  Expiry uses tokio's clock so it follows paused
//! time in tests.

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::Error;

/// How long a banner stays up.
pub const BANNER_TTL: Duration = Duration::from_secs(5);

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    /// The free token could not be obtained or stored.
    TokenBootstrap,
    /// A query failed in transport or came back with a non-2xx status.
    Api,
}

impl BannerKind {
    /// The user-facing text for this kind of failure.
    pub fn message(&self) -> &'static str {
        match self {
            BannerKind::TokenBootstrap => {
                "Failed to connect to server. Please check your connection."
            }
            BannerKind::Api => "Sorry, something went wrong. Please try again.",
        }
    }
}

impl fmt::Display for BannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BannerKind::TokenBootstrap => write!(f, "token bootstrap"),
            BannerKind::Api => write!(f, "api"),
        }
    }
}

/// A banner currently (or formerly) on display.
#[derive(Debug, Clone)]
pub struct Banner {
    /// Increases with every banner raised on a board.
    pub serial: u64,
    /// What went wrong.
    pub kind: BannerKind,
    /// The text shown to the user.
    pub text: String,
    /// The underlying error, for logs and verbose output.
    pub detail: String,
    /// HTTP status code, when the failure had one.
    pub status_code: Option<u16>,
    raised_at: Instant,
    ttl: Duration,
}

impl Banner {
    /// When this banner disappears.
    pub fn expires_at(&self) -> Instant {
        self.raised_at + self.ttl
    }

    /// Returns true if the banner has timed out at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }
}

#[derive(Debug, Default)]
struct Slot {
    current: Option<Banner>,
    next_serial: u64,
}

/// Holds the banner on display.
#[derive(Debug)]
pub struct BannerBoard {
    slot: Mutex<Slot>,
    ttl: Duration,
    raised: watch::Sender<u64>,
}

impl BannerBoard {
    /// Creates a board whose banners last [`BANNER_TTL`].
    pub fn new() -> Self {
        Self::with_ttl(BANNER_TTL)
    }

    /// Creates a board with a custom banner lifetime.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            ttl,
            raised: watch::Sender::new(0),
        }
    }

    /// Shows a banner for `error`, replacing whatever was up.
    pub fn raise(&self, kind: BannerKind, error: &Error) -> Banner {
        let mut slot = self.lock();
        slot.next_serial += 1;
        let banner = Banner {
            serial: slot.next_serial,
            kind,
            text: kind.message().to_string(),
            detail: error.to_string(),
            status_code: error.status_code(),
            raised_at: Instant::now(),
            ttl: self.ttl,
        };
        slot.current = Some(banner.clone());
        self.raised.send_replace(banner.serial);
        banner
    }

    /// Returns a receiver that observes the serial of every banner raised
    /// from now on.
    ///
    /// Lets a front end show a banner raised by a background task while it
    /// is waiting on something else.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.raised.subscribe()
    }

    /// Returns the banner on display, dropping it first if it has expired.
    pub fn current(&self) -> Option<Banner> {
        let mut slot = self.lock();
        if slot
            .current
            .as_ref()
            .is_some_and(|b| b.is_expired_at(Instant::now()))
        {
            slot.current = None;
        }
        slot.current.clone()
    }

    /// Removes the banner on display.  Returns true if there was one.
    pub fn dismiss(&self) -> bool {
        self.lock().current.take().is_some()
    }

    /// Returns the number of banners raised so far.
    pub fn raised(&self) -> u64 {
        self.lock().next_serial
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for BannerBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn banner_expires_after_ttl() {
        let board = BannerBoard::new();
        board.raise(BannerKind::Api, &Error::api(500, ""));

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(board.current().is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(board.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn new_banner_replaces_old() {
        let board = BannerBoard::new();
        board.raise(
            BannerKind::TokenBootstrap,
            &Error::token_bootstrap("no access_token"),
        );
        tokio::time::advance(Duration::from_secs(3)).await;
        let second = board.raise(BannerKind::Api, &Error::api(502, "bad gateway"));

        let current = board.current().unwrap();
        assert_eq!(current.serial, second.serial);
        assert_eq!(current.kind, BannerKind::Api);
        assert_eq!(current.status_code, Some(502));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(board.current().is_some());
        assert_eq!(board.raised(), 2);
    }

    #[tokio::test]
    async fn dismiss_clears() {
        let board = BannerBoard::new();
        assert!(!board.dismiss());
        board.raise(BannerKind::Api, &Error::connection("refused", None));
        assert!(board.dismiss());
        assert!(board.current().is_none());
    }

    #[tokio::test]
    async fn subscribers_see_raises() {
        let board = std::sync::Arc::new(BannerBoard::new());
        let mut raised = board.subscribe();

        let background = board.clone();
        tokio::spawn(async move {
            background.raise(BannerKind::TokenBootstrap, &Error::connection("refused", None));
        });

        raised.changed().await.unwrap();
        let serial = *raised.borrow_and_update();
        let current = board.current().unwrap();
        assert_eq!(current.serial, serial);
        assert_eq!(current.kind, BannerKind::TokenBootstrap);
        assert!(!raised.has_changed().unwrap());
    }

    #[test]
    fn banner_texts() {
        assert_eq!(
            BannerKind::TokenBootstrap.message(),
            "Failed to connect to server. Please check your connection."
        );
        assert_eq!(
            BannerKind::Api.message(),
            "Sorry, something went wrong. Please try again."
        );
    }
}
