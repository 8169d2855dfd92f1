//! Device state store
//!
//! One `StateStore` is shared by every session. All reads and writes go through
//! a single mutex so each operation sees a consistent state; the lock is never
//! held across an `.await`.

use chrono::{DateTime, Local, TimeZone};
use parking_lot::Mutex;
use phoneos_protocol::{AppData, AppList, StatusView};
use std::collections::VecDeque;
use thiserror::Error;

use super::apps::{self, HOME_APP};
use super::notifications::Notification;

/// Default number of notifications retained
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("App not found")]
    AppNotFound,
}

/// Partial settings update; `None` fields are left as they are
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub brightness: Option<i64>,
    pub volume: Option<i64>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.brightness.is_none() && self.volume.is_none()
    }
}

/// Mutable device state guarded by the store
#[derive(Debug)]
struct DeviceState {
    /// Always an id from the registry
    current_app: &'static str,
    battery: u8,
    wifi_strength: u8,
    brightness: i64,
    volume: i64,
    notifications: VecDeque<Notification>,
    /// Total appended, including evicted entries
    delivered: u64,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            current_app: HOME_APP,
            battery: 85,
            wifi_strength: 3,
            brightness: 80,
            volume: 60,
            notifications: VecDeque::new(),
            delivered: 0,
        }
    }
}

impl DeviceState {
    fn app_data(&self, app_id: &str) -> AppData {
        match app_id {
            "calculator" => AppData::Calculator {
                display: "0".to_string(),
                operation: None,
            },
            "weather" => AppData::Weather {
                temperature: "22°C".to_string(),
                condition: "Sunny".to_string(),
                humidity: "65%".to_string(),
                wind: "5 km/h".to_string(),
            },
            "settings" => AppData::Settings {
                brightness: self.brightness,
                volume: self.volume,
                wifi: self.wifi_strength > 0,
            },
            _ => AppData::Empty {},
        }
    }
}

/// Shared device state
#[derive(Debug)]
pub struct StateStore {
    state: Mutex<DeviceState>,
    notification_capacity: usize,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_CAPACITY)
    }
}

impl StateStore {
    /// Create a store that keeps at most `notification_capacity` notifications
    /// (the oldest are dropped first). A capacity of 0 is treated as 1.
    pub fn new(notification_capacity: usize) -> Self {
        Self {
            state: Mutex::new(DeviceState::default()),
            notification_capacity: notification_capacity.max(1),
        }
    }

    /// Status bar view, with time and date taken from the local clock now
    pub fn snapshot(&self) -> StatusView {
        self.snapshot_at(&Local::now())
    }

    pub fn snapshot_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> StatusView
    where
        Tz::Offset: std::fmt::Display,
    {
        let state = self.state.lock();
        StatusView {
            time: format_time(now),
            date: format_date(now),
            battery: state.battery,
            wifi: state.wifi_strength,
            current_app: state.current_app.to_string(),
            notifications: state.delivered,
            brightness: state.brightness,
            volume: state.volume,
        }
    }

    pub fn list_apps(&self) -> AppList {
        apps::app_list()
    }

    /// Switch to `app_id`. Unknown ids leave the state untouched.
    pub fn open_app(&self, app_id: &str) -> Result<AppData, StoreError> {
        let app = apps::find(app_id).ok_or(StoreError::AppNotFound)?;
        let mut state = self.state.lock();
        state.current_app = app.id;
        Ok(state.app_data(app.id))
    }

    pub fn go_home(&self) {
        self.state.lock().current_app = HOME_APP;
    }

    /// Apply present fields verbatim. No range checks.
    pub fn update_settings(&self, patch: SettingsPatch) {
        let mut state = self.state.lock();
        if let Some(brightness) = patch.brightness {
            state.brightness = brightness;
        }
        if let Some(volume) = patch.volume {
            state.volume = volume;
        }
    }

    pub fn append_notification(&self, title: &str, message: &str) -> Notification {
        let time = format_time(&Local::now());
        let mut state = self.state.lock();
        let notification = Notification {
            id: state.delivered,
            title: title.to_string(),
            message: message.to_string(),
            time,
        };
        state.delivered += 1;
        if state.notifications.len() == self.notification_capacity {
            state.notifications.pop_front();
        }
        state.notifications.push_back(notification.clone());
        notification
    }

    /// Retained notifications, oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().notifications.iter().cloned().collect()
    }

    pub fn current_app(&self) -> &'static str {
        self.state.lock().current_app
    }

    pub fn notification_capacity(&self) -> usize {
        self.notification_capacity
    }
}

/// "HH:MM"
pub fn format_time<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%H:%M").to_string()
}

/// "<Weekday>, <Month> <DD>"
pub fn format_date<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%A, %B %d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::apps::APPS;
    use chrono::Utc;
    use std::sync::Arc;

    #[test]
    fn test_default_state() {
        let store = StateStore::default();
        let status = store.snapshot();
        assert_eq!(status.current_app, "home");
        assert_eq!(status.battery, 85);
        assert_eq!(status.wifi, 3);
        assert_eq!(status.brightness, 80);
        assert_eq!(status.volume, 60);
        assert_eq!(status.notifications, 0);
    }

    #[test]
    fn test_snapshot_clock_format() {
        let store = StateStore::default();
        let now = Utc.with_ymd_and_hms(2024, 1, 9, 9, 41, 0).unwrap();
        let status = store.snapshot_at(&now);
        assert_eq!(status.time, "09:41");
        assert_eq!(status.date, "Tuesday, January 09");
    }

    #[test]
    fn test_open_every_registered_app() {
        let store = StateStore::default();
        for app in APPS.iter() {
            let data = store.open_app(app.id).unwrap();
            assert_eq!(store.current_app(), app.id);
            match app.id {
                "calculator" => assert_eq!(
                    data,
                    AppData::Calculator { display: "0".into(), operation: None }
                ),
                "weather" => assert!(matches!(data, AppData::Weather { ref temperature, .. } if temperature == "22°C")),
                "settings" => assert_eq!(
                    data,
                    AppData::Settings { brightness: 80, volume: 60, wifi: true }
                ),
                _ => assert_eq!(data, AppData::Empty {}),
            }
        }
    }

    #[test]
    fn test_open_unknown_app_keeps_current() {
        let store = StateStore::default();
        store.open_app("music").unwrap();
        let err = store.open_app("solitaire").unwrap_err();
        assert_eq!(err, StoreError::AppNotFound);
        assert_eq!(err.to_string(), "App not found");
        assert_eq!(store.current_app(), "music");
    }

    #[test]
    fn test_go_home() {
        let store = StateStore::default();
        store.go_home();
        assert_eq!(store.current_app(), "home");
        store.open_app("maps").unwrap();
        store.go_home();
        assert_eq!(store.current_app(), "home");
    }

    #[test]
    fn test_update_settings_partial() {
        let store = StateStore::default();
        store.update_settings(SettingsPatch { brightness: Some(50), volume: None });
        let status = store.snapshot();
        assert_eq!(status.brightness, 50);
        assert_eq!(status.volume, 60);

        store.update_settings(SettingsPatch::default());
        let after = store.snapshot();
        assert_eq!(after.brightness, 50);
        assert_eq!(after.volume, 60);
    }

    #[test]
    fn test_update_settings_not_clamped() {
        let store = StateStore::default();
        store.update_settings(SettingsPatch { brightness: Some(250), volume: Some(-5) });
        let status = store.snapshot();
        assert_eq!(status.brightness, 250);
        assert_eq!(status.volume, -5);
    }

    #[test]
    fn test_settings_app_reflects_live_state() {
        let store = StateStore::default();
        store.update_settings(SettingsPatch { brightness: Some(10), volume: Some(20) });
        assert_eq!(
            store.open_app("settings").unwrap(),
            AppData::Settings { brightness: 10, volume: 20, wifi: true }
        );
    }

    #[test]
    fn test_append_notification_increments_count() {
        let store = StateStore::default();
        let first = store.append_notification("Messages", "hi");
        let second = store.append_notification("Phone", "call");
        assert_eq!(first.id, 0);
        assert_eq!(second.id, 1);
        assert_eq!(first.time.len(), 5);
        assert_eq!(store.snapshot().notifications, 2);
        assert_eq!(store.notifications().len(), 2);
    }

    #[test]
    fn test_notification_ring_buffer() {
        let store = StateStore::new(3);
        for i in 0..5 {
            store.append_notification("t", &format!("m{i}"));
        }
        let kept = store.notifications();
        assert_eq!(kept.len(), 3);
        assert_eq!(kept.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(kept[0].message, "m2");
        assert_eq!(store.snapshot().notifications, 5);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let store = StateStore::new(0);
        store.append_notification("a", "b");
        store.append_notification("c", "d");
        assert_eq!(store.notifications().len(), 1);
    }

    #[test]
    fn test_concurrent_open_app() {
        let store = Arc::new(StateStore::default());
        let ids: Vec<&'static str> = APPS.iter().map(|app| app.id).collect();

        let handles: Vec<_> = (0..100)
            .map(|i| {
                let store = Arc::clone(&store);
                let id = ids[i % ids.len()];
                std::thread::spawn(move || store.open_app(id).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(ids.contains(&store.current_app()));
        assert_eq!(store.list_apps().len(), 12);
        assert_eq!(store.snapshot().notifications, 0);
    }
}
