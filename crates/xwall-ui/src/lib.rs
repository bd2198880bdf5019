//! Menu-bar menu model.
//!
//! Describes the menu as plain data so the platform layer only has to
//! render entries and report which action was picked.

use tracing::info;
use xwall_core::config::{MAX_MONITOR_INTERVAL, MIN_MONITOR_INTERVAL, MONITOR_INTERVAL_STEP};
use xwall_core::{Settings, WallpaperController};

pub const TRAY_TITLE: &str = "🎞️";
pub const TRAY_TOOLTIP: &str = "X wallpaper";

/// Boolean settings exposed as check items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingToggle {
    DefaultMuted,
    EnableBounce,
    AutoPauseOnFullscreen,
    AutoPauseInBackground,
    LaunchWithApp,
    JoinAllSpaces,
    LaunchAtLogin,
}

impl SettingToggle {
    pub const ALL: [SettingToggle; 7] = [
        SettingToggle::DefaultMuted,
        SettingToggle::EnableBounce,
        SettingToggle::AutoPauseOnFullscreen,
        SettingToggle::AutoPauseInBackground,
        SettingToggle::LaunchWithApp,
        SettingToggle::JoinAllSpaces,
        SettingToggle::LaunchAtLogin,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingToggle::DefaultMuted => "Mute by Default",
            SettingToggle::EnableBounce => "Bounce Loop",
            SettingToggle::AutoPauseOnFullscreen => "Pause When an App Is Fullscreen",
            SettingToggle::AutoPauseInBackground => "Pause When the Desktop Is Not in Front",
            SettingToggle::LaunchWithApp => "Show Wallpaper at Launch",
            SettingToggle::JoinAllSpaces => "Show on All Spaces",
            SettingToggle::LaunchAtLogin => "Launch at Login",
        }
    }

    fn field(self, settings: &mut Settings) -> &mut bool {
        match self {
            SettingToggle::DefaultMuted => &mut settings.default_muted,
            SettingToggle::EnableBounce => &mut settings.enable_bounce,
            SettingToggle::AutoPauseOnFullscreen => &mut settings.auto_pause_on_fullscreen,
            SettingToggle::AutoPauseInBackground => &mut settings.auto_pause_in_background,
            SettingToggle::LaunchWithApp => &mut settings.launch_with_app,
            SettingToggle::JoinAllSpaces => &mut settings.join_all_spaces,
            SettingToggle::LaunchAtLogin => &mut settings.launch_at_login,
        }
    }

    pub fn get(self, settings: &Settings) -> bool {
        match self {
            SettingToggle::DefaultMuted => settings.default_muted,
            SettingToggle::EnableBounce => settings.enable_bounce,
            SettingToggle::AutoPauseOnFullscreen => settings.auto_pause_on_fullscreen,
            SettingToggle::AutoPauseInBackground => settings.auto_pause_in_background,
            SettingToggle::LaunchWithApp => settings.launch_with_app,
            SettingToggle::JoinAllSpaces => settings.join_all_spaces,
            SettingToggle::LaunchAtLogin => settings.launch_at_login,
        }
    }

    pub fn flip(self, settings: &mut Settings) {
        let field = self.field(settings);
        *field = !*field;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuAction {
    ShowPanel,
    TogglePlay,
    Import,
    ToggleMute,
    RemoveWallpaper,
    Toggle(SettingToggle),
    /// Monitor interval in half seconds.
    SetInterval(u8),
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuEntry {
    Item {
        label: String,
        action: MenuAction,
        enabled: bool,
    },
    Check {
        label: String,
        action: MenuAction,
        checked: bool,
    },
    Submenu {
        label: String,
        entries: Vec<MenuEntry>,
    },
    /// Disabled informational line.
    Status(String),
    Separator,
}

impl MenuEntry {
    fn item(label: impl Into<String>, action: MenuAction, enabled: bool) -> Self {
        MenuEntry::Item {
            label: label.into(),
            action,
            enabled,
        }
    }

    fn check(label: impl Into<String>, action: MenuAction, checked: bool) -> Self {
        MenuEntry::Check {
            label: label.into(),
            action,
            checked,
        }
    }
}

/// Everything the menu labels depend on.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuState {
    pub playing: bool,
    pub has_source: bool,
    pub has_surface: bool,
    pub status: String,
    pub settings: Settings,
}

impl MenuState {
    pub fn capture(controller: &WallpaperController) -> Self {
        Self {
            playing: controller.playback().is_playing(),
            has_source: controller.playback().is_ready(),
            has_surface: controller.has_surface(),
            status: controller.status().to_string(),
            settings: controller.settings().clone(),
        }
    }

    pub fn entries(&self) -> Vec<MenuEntry> {
        let play_label = if self.playing { "Pause" } else { "Play" };
        let mute_label = if self.settings.default_muted {
            "Unmute"
        } else {
            "Mute"
        };

        let mut settings: Vec<MenuEntry> = SettingToggle::ALL
            .iter()
            .map(|toggle| {
                MenuEntry::check(
                    toggle.label(),
                    MenuAction::Toggle(*toggle),
                    toggle.get(&self.settings),
                )
            })
            .collect();
        settings.push(MenuEntry::Separator);
        settings.push(MenuEntry::Submenu {
            label: format!("Check Interval ({:.1}s)", self.settings.monitor_interval),
            entries: interval_entries(self.settings.monitor_interval),
        });

        vec![
            MenuEntry::item("Show Panel", MenuAction::ShowPanel, true),
            MenuEntry::Separator,
            MenuEntry::item(play_label, MenuAction::TogglePlay, self.has_source),
            MenuEntry::item("Import Video…", MenuAction::Import, true),
            MenuEntry::item(mute_label, MenuAction::ToggleMute, true),
            MenuEntry::item(
                "Remove Wallpaper",
                MenuAction::RemoveWallpaper,
                self.has_source || self.has_surface,
            ),
            MenuEntry::Separator,
            MenuEntry::Submenu {
                label: "Settings".to_string(),
                entries: settings,
            },
            MenuEntry::Separator,
            MenuEntry::Status(self.status.clone()),
            MenuEntry::Separator,
            MenuEntry::item("Quit", MenuAction::Quit, true),
        ]
    }
}

fn interval_entries(current: f64) -> Vec<MenuEntry> {
    let first = (MIN_MONITOR_INTERVAL / MONITOR_INTERVAL_STEP).round() as u8;
    let last = (MAX_MONITOR_INTERVAL / MONITOR_INTERVAL_STEP).round() as u8;
    (first..=last)
        .map(|halves| {
            let seconds = interval_seconds(halves);
            MenuEntry::check(
                format!("{seconds:.1}s"),
                MenuAction::SetInterval(halves),
                (seconds - current).abs() < f64::EPSILON,
            )
        })
        .collect()
}

pub fn interval_seconds(halves: u8) -> f64 {
    f64::from(halves) * MONITOR_INTERVAL_STEP
}

/// What the platform layer still has to do after an action was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    Handled,
    /// Show the file picker and hand the result to `import`.
    PickFile,
    Quit,
}

pub fn dispatch(action: MenuAction, controller: &mut WallpaperController) -> MenuOutcome {
    info!("menu: {action:?}");
    match action {
        MenuAction::ShowPanel => controller.show_panel(),
        MenuAction::TogglePlay => controller.toggle_play(),
        MenuAction::Import => return MenuOutcome::PickFile,
        MenuAction::ToggleMute => controller.toggle_mute(),
        MenuAction::RemoveWallpaper => controller.remove_wallpaper(),
        MenuAction::Toggle(SettingToggle::DefaultMuted) => controller.toggle_mute(),
        MenuAction::Toggle(toggle) => controller.update_settings(|s| toggle.flip(s)),
        MenuAction::SetInterval(halves) => {
            controller.update_settings(|s| s.monitor_interval = interval_seconds(halves))
        }
        MenuAction::Quit => return MenuOutcome::Quit,
    }
    MenuOutcome::Handled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(playing: bool, muted: bool) -> MenuState {
        MenuState {
            playing,
            has_source: true,
            has_surface: true,
            status: "Playing".to_string(),
            settings: Settings {
                default_muted: muted,
                ..Settings::default()
            },
        }
    }

    fn labels(entries: &[MenuEntry]) -> Vec<String> {
        entries
            .iter()
            .filter_map(|entry| match entry {
                MenuEntry::Item { label, .. }
                | MenuEntry::Check { label, .. }
                | MenuEntry::Submenu { label, .. } => Some(label.clone()),
                MenuEntry::Status(text) => Some(text.clone()),
                MenuEntry::Separator => None,
            })
            .collect()
    }

    fn submenu<'a>(entries: &'a [MenuEntry], name: &str) -> &'a [MenuEntry] {
        entries
            .iter()
            .find_map(|entry| match entry {
                MenuEntry::Submenu { label, entries } if label.starts_with(name) => {
                    Some(entries.as_slice())
                }
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_labels_follow_state() {
        let playing_muted = labels(&state(true, true).entries());
        assert!(playing_muted.contains(&"Pause".to_string()));
        assert!(playing_muted.contains(&"Unmute".to_string()));

        let paused_loud = labels(&state(false, false).entries());
        assert!(paused_loud.contains(&"Play".to_string()));
        assert!(paused_loud.contains(&"Mute".to_string()));
    }

    #[test]
    fn test_status_line_is_present() {
        let entries = state(true, true).entries();
        assert!(entries.contains(&MenuEntry::Status("Playing".to_string())));
        assert!(matches!(
            entries.last(),
            Some(MenuEntry::Item {
                action: MenuAction::Quit,
                ..
            })
        ));
    }

    #[test]
    fn test_actions_disabled_without_source() {
        let mut menu = state(false, true);
        menu.has_source = false;
        menu.has_surface = false;
        let entries = menu.entries();
        let disabled: Vec<MenuAction> = entries
            .iter()
            .filter_map(|entry| match entry {
                MenuEntry::Item {
                    action,
                    enabled: false,
                    ..
                } => Some(*action),
                _ => None,
            })
            .collect();
        assert_eq!(disabled, vec![MenuAction::TogglePlay, MenuAction::RemoveWallpaper]);
    }

    #[test]
    fn test_empty_surface_can_be_removed() {
        let mut menu = state(false, true);
        menu.has_source = false;
        let entries = menu.entries();
        assert!(entries.contains(&MenuEntry::item(
            "Remove Wallpaper",
            MenuAction::RemoveWallpaper,
            true
        )));
        assert!(entries.contains(&MenuEntry::item("Play", MenuAction::TogglePlay, false)));
    }

    #[test]
    fn test_settings_checks_mirror_settings() {
        let mut menu = state(false, false);
        menu.settings.join_all_spaces = false;
        let entries = menu.entries();
        let settings = submenu(&entries, "Settings");
        for entry in settings {
            if let MenuEntry::Check {
                action: MenuAction::Toggle(toggle),
                checked,
                ..
            } = entry
            {
                assert_eq!(*checked, toggle.get(&menu.settings), "{toggle:?}");
            }
        }
    }

    #[test]
    fn test_interval_submenu() {
        let mut menu = state(false, false);
        menu.settings.monitor_interval = 2.5;
        let entries = menu.entries();
        let intervals = submenu(submenu(&entries, "Settings"), "Check Interval");
        assert_eq!(intervals.len(), 10);
        let checked: Vec<&MenuEntry> = intervals
            .iter()
            .filter(|e| matches!(e, MenuEntry::Check { checked: true, .. }))
            .collect();
        assert_eq!(
            checked,
            vec![&MenuEntry::check("2.5s", MenuAction::SetInterval(5), true)]
        );
    }

    #[test]
    fn test_flip_toggles_one_field() {
        let mut settings = Settings::default();
        SettingToggle::JoinAllSpaces.flip(&mut settings);
        assert!(!settings.join_all_spaces);
        assert_eq!(
            settings,
            Settings {
                join_all_spaces: false,
                ..Settings::default()
            }
        );
    }
}
