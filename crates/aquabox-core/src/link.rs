//! Network link state as seen by the nodes
//!
//! Joining and re-joining the access point belongs to the platform. The
//! nodes only ask whether the link is up and, rate limited by
//! [`ReconnectThrottle`], ask for a reconnect when it is not.

use embassy_time::{Duration, Instant, Timer};

pub trait Link {
    fn is_up(&self) -> bool;

    /// Ask the platform to drop and re-join. Must not block.
    fn request_reconnect(&mut self);
}

/// Spaces reconnect requests at least `interval` apart.
///
/// The clock restarts whenever the link is seen up, so a link that just
/// dropped waits a full interval before the first request.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectThrottle {
    interval: Duration,
    last_check: Option<Instant>,
}

impl ReconnectThrottle {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_check: None,
        }
    }

    pub fn link_up(&mut self, now: Instant) {
        self.last_check = Some(now);
    }

    /// Whether a reconnect may be requested at `now`. Granting one restarts
    /// the interval.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        let due = match self.last_check {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.last_check = Some(now);
        }
        due
    }
}

/// Wait up to `window` for the link to come up. Returns whether it did.
pub async fn wait_for_link<L: Link>(link: &L, window: Duration, poll: Duration) -> bool {
    let deadline = Instant::now() + window;
    loop {
        if link.is_up() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        Timer::after(poll).await;
    }
}
