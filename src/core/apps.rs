//! Static app registry
//!
//! The set of openable apps is fixed at compile time and never mutated, so it
//! is read without any locking.

use phoneos_protocol::{AppInfo, AppList};

/// Id of the home screen app
pub const HOME_APP: &str = "home";

/// One registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

impl AppSpec {
    const fn new(id: &'static str, name: &'static str, icon: &'static str) -> Self {
        Self { id, name, icon }
    }

    pub fn info(&self) -> AppInfo {
        AppInfo {
            name: self.name.to_string(),
            icon: self.icon.to_string(),
        }
    }
}

/// All registered apps, in home-screen order
pub static APPS: [AppSpec; 12] = [
    AppSpec::new("home", "Home", "H"),
    AppSpec::new("phone", "Phone", "P"),
    AppSpec::new("messages", "Messages", "M"),
    AppSpec::new("camera", "Camera", "C"),
    AppSpec::new("photos", "Photos", "I"),
    AppSpec::new("settings", "Settings", "S"),
    AppSpec::new("calculator", "Calculator", "#"),
    AppSpec::new("clock", "Clock", "T"),
    AppSpec::new("weather", "Weather", "W"),
    AppSpec::new("music", "Music", "♪"),
    AppSpec::new("maps", "Maps", "MAP"),
    AppSpec::new("browser", "Browser", "B"),
];

/// Look up a registered app by id
pub fn find(id: &str) -> Option<&'static AppSpec> {
    APPS.iter().find(|app| app.id == id)
}

/// Registry in wire form
pub fn app_list() -> AppList {
    AppList(APPS.iter().map(|app| (app.id.to_string(), app.info())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_ids_unique() {
        let ids: HashSet<_> = APPS.iter().map(|app| app.id).collect();
        assert_eq!(ids.len(), APPS.len());
    }

    #[test]
    fn test_home_is_registered() {
        assert_eq!(find(HOME_APP).map(|app| app.name), Some("Home"));
    }

    #[test]
    fn test_find_unknown() {
        assert!(find("solitaire").is_none());
        assert!(find("").is_none());
        assert!(find("Home").is_none());
    }

    #[test]
    fn test_app_list_order() {
        let list = app_list();
        assert_eq!(list.len(), 12);
        assert_eq!(list.ids().next(), Some("home"));
        assert_eq!(list.ids().last(), Some("browser"));
        assert_eq!(list.get("maps").map(|info| info.icon.as_str()), Some("MAP"));
    }
}
