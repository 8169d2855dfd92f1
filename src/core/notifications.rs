//! Synthetic notifications
//!
//! The notification generator draws from a small catalog of canned messages
//! at random intervals.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A delivered notification, as kept in the device state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Sequence number, starting at 0
    pub id: u64,
    pub title: String,
    pub message: String,
    /// Delivery time, "HH:MM"
    pub time: String,
}

/// Catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CannedNotification {
    pub title: &'static str,
    pub message: &'static str,
}

pub const CATALOG: &[CannedNotification] = &[
    CannedNotification { title: "Messages", message: "New message from Alex" },
    CannedNotification { title: "Phone", message: "Missed call from Mom" },
    CannedNotification { title: "Calendar", message: "Team meeting in 15 minutes" },
    CannedNotification { title: "Weather", message: "Rain expected this afternoon" },
    CannedNotification { title: "Battery", message: "Battery fully charged" },
    CannedNotification { title: "Music", message: "New album from your favorite artist" },
    CannedNotification { title: "Mail", message: "You have 3 unread emails" },
];

/// Uniform pick from the catalog
pub fn pick_random() -> &'static CannedNotification {
    CATALOG
        .choose(&mut rand::thread_rng())
        .unwrap_or(&CATALOG[0])
}

/// Uniform delay in `[min, max]`. Swapped bounds are tolerated.
pub fn random_delay(min: Duration, max: Duration) -> Duration {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if lo == hi {
        return lo;
    }
    let millis = rand::thread_rng().gen_range(lo.as_millis()..=hi.as_millis());
    Duration::from_millis(millis as u64)
}
