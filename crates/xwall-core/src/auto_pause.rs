//! Auto-pause decision engine.
//!
//! Decides from a snapshot of the desktop whether playback has to yield
//! to something the user is doing in front of the wallpaper.

use std::fmt;

use xwall_platform::{DesktopProbe, ForegroundApp, Rect};

/// Bundle identifier of the process that owns the desktop and its icons.
pub const DESKTOP_SHELL_BUNDLE_ID: &str = "com.apple.finder";
/// Fraction of the main screen a window must cover to count as maximized.
pub const COVERAGE_THRESHOLD: f64 = 0.98;
/// Windows narrower or shorter than this never count as maximized.
pub const MIN_WINDOW_EDGE: f64 = 300.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoPauseToggles {
    pub on_fullscreen: bool,
    pub in_background: bool,
}

/// Which rules currently want playback paused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoPauseReason {
    pub fullscreen: bool,
    pub background: bool,
}

impl AutoPauseReason {
    pub const NONE: Self = Self {
        fullscreen: false,
        background: false,
    };

    pub fn is_active(&self) -> bool {
        self.fullscreen || self.background
    }
}

impl fmt::Display for AutoPauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.fullscreen, self.background) {
            (false, false) => f.write_str("none"),
            (true, false) => f.write_str("fullscreen window"),
            (false, true) => f.write_str("app in front"),
            (true, true) => f.write_str("fullscreen window, app in front"),
        }
    }
}

/// Everything the engine looks at, captured at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesktopSnapshot {
    pub foreground: Option<ForegroundApp>,
    pub native_fullscreen: bool,
    pub windows: Vec<Rect>,
    pub screen: Option<Rect>,
}

pub struct AutoPauseEngine {
    excluded: Vec<String>,
    own_pid: Option<i32>,
}

impl AutoPauseEngine {
    /// `own_bundle_id` keeps the app's own windows from pausing it.
    pub fn new(own_bundle_id: Option<&str>) -> Self {
        let mut excluded = vec![DESKTOP_SHELL_BUNDLE_ID.to_string()];
        if let Some(id) = own_bundle_id.filter(|id| !id.is_empty()) {
            excluded.push(id.to_string());
        }
        Self {
            excluded,
            own_pid: None,
        }
    }

    /// Also excludes the app by process id. An unbundled binary has no
    /// bundle id to match on.
    pub fn with_own_pid(mut self, pid: i32) -> Self {
        self.own_pid = Some(pid);
        self
    }

    pub fn is_excluded(&self, app: &ForegroundApp) -> bool {
        if self.own_pid == Some(app.pid) {
            return true;
        }
        app.bundle_id
            .as_deref()
            .is_some_and(|id| self.excluded.iter().any(|ex| ex == id))
    }

    /// Queries the probe for what `toggles` needs. Window geometry is only
    /// fetched when the fullscreen rule is on and the app is not excluded.
    pub fn capture(&self, probe: &dyn DesktopProbe, toggles: AutoPauseToggles) -> DesktopSnapshot {
        let foreground = probe.frontmost_app();
        let mut snapshot = DesktopSnapshot {
            foreground,
            ..DesktopSnapshot::default()
        };
        if !toggles.on_fullscreen {
            return snapshot;
        }
        let Some(app) = snapshot.foreground.as_ref() else {
            return snapshot;
        };
        if self.is_excluded(app) {
            return snapshot;
        }
        snapshot.native_fullscreen = probe.is_native_fullscreen(app);
        if !snapshot.native_fullscreen {
            snapshot.windows = probe.window_frames(app.pid);
            snapshot.screen = probe.main_screen_frame();
        }
        snapshot
    }

    pub fn evaluate(&self, snapshot: &DesktopSnapshot, toggles: AutoPauseToggles) -> AutoPauseReason {
        let excluded = snapshot
            .foreground
            .as_ref()
            .is_some_and(|app| self.is_excluded(app));
        if excluded {
            return AutoPauseReason::NONE;
        }

        let fullscreen = toggles.on_fullscreen
            && snapshot.foreground.is_some()
            && (snapshot.native_fullscreen
                || snapshot.screen.is_some_and(|screen| {
                    snapshot.windows.iter().any(|w| covers_screen(w, &screen))
                }));

        // No foreground app, or one without a bundle id, is not the desktop.
        let background = toggles.in_background;

        AutoPauseReason {
            fullscreen,
            background,
        }
    }

    pub fn evaluate_probe(&self, probe: &dyn DesktopProbe, toggles: AutoPauseToggles) -> AutoPauseReason {
        let snapshot = self.capture(probe, toggles);
        self.evaluate(&snapshot, toggles)
    }
}

/// Maximized heuristic: large enough on both axes and covering at least
/// [`COVERAGE_THRESHOLD`] of the screen area.
pub fn covers_screen(window: &Rect, screen: &Rect) -> bool {
    if window.width < MIN_WINDOW_EDGE || window.height < MIN_WINDOW_EDGE {
        return false;
    }
    let screen_area = screen.area();
    if screen_area <= 0.0 {
        return false;
    }
    window.area() / screen_area >= COVERAGE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDesktop;

    const SCREEN: Rect = Rect::new(0.0, 0.0, 1440.0, 900.0);

    fn app(bundle_id: &str) -> ForegroundApp {
        ForegroundApp {
            bundle_id: Some(bundle_id.to_string()),
            pid: 42,
        }
    }

    fn snapshot(foreground: ForegroundApp, fullscreen: bool) -> DesktopSnapshot {
        DesktopSnapshot {
            foreground: Some(foreground),
            native_fullscreen: fullscreen,
            windows: Vec::new(),
            screen: Some(SCREEN),
        }
    }

    #[test]
    fn test_truth_table() {
        let engine = AutoPauseEngine::new(Some("dev.xwall.app"));
        for fs_enabled in [false, true] {
            for bg_enabled in [false, true] {
                for fs_detected in [false, true] {
                    for non_desktop in [false, true] {
                        let foreground = if non_desktop {
                            app("com.apple.Safari")
                        } else {
                            app(DESKTOP_SHELL_BUNDLE_ID)
                        };
                        let toggles = AutoPauseToggles {
                            on_fullscreen: fs_enabled,
                            in_background: bg_enabled,
                        };
                        let reason = engine.evaluate(&snapshot(foreground, fs_detected), toggles);
                        // Fullscreen on the desktop shell itself never counts.
                        let expected = (fs_enabled && fs_detected && non_desktop)
                            || (bg_enabled && non_desktop);
                        assert_eq!(
                            reason.is_active(),
                            expected,
                            "fs_enabled={fs_enabled} bg_enabled={bg_enabled} \
                             fs_detected={fs_detected} non_desktop={non_desktop}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_own_app_is_excluded() {
        let engine = AutoPauseEngine::new(Some("dev.xwall.app"));
        let toggles = AutoPauseToggles {
            on_fullscreen: true,
            in_background: true,
        };
        let reason = engine.evaluate(&snapshot(app("dev.xwall.app"), true), toggles);
        assert_eq!(reason, AutoPauseReason::NONE);
    }

    #[test]
    fn test_own_process_is_excluded_without_bundle_id() {
        let engine = AutoPauseEngine::new(None).with_own_pid(4242);
        let toggles = AutoPauseToggles {
            on_fullscreen: true,
            in_background: true,
        };
        let own = ForegroundApp {
            bundle_id: None,
            pid: 4242,
        };
        assert_eq!(engine.evaluate(&snapshot(own, true), toggles), AutoPauseReason::NONE);

        let other = ForegroundApp {
            bundle_id: None,
            pid: 4243,
        };
        assert!(engine.evaluate(&snapshot(other, false), toggles).background);
    }

    #[test]
    fn test_unknown_foreground_counts_as_background() {
        let engine = AutoPauseEngine::new(None);
        let toggles = AutoPauseToggles {
            on_fullscreen: true,
            in_background: true,
        };
        let reason = engine.evaluate(&DesktopSnapshot::default(), toggles);
        assert!(reason.background);
        assert!(!reason.fullscreen);

        let nameless = ForegroundApp {
            bundle_id: None,
            pid: 7,
        };
        assert!(engine.evaluate(&snapshot(nameless, false), toggles).background);
    }

    #[test]
    fn test_maximized_window_counts_as_fullscreen() {
        let engine = AutoPauseEngine::new(None);
        let toggles = AutoPauseToggles {
            on_fullscreen: true,
            in_background: false,
        };
        let mut snap = snapshot(app("com.apple.Safari"), false);
        snap.windows = vec![Rect::new(0.0, 0.0, 1440.0, 890.0)];
        assert!(engine.evaluate(&snap, toggles).fullscreen);

        snap.windows = vec![Rect::new(0.0, 0.0, 1200.0, 800.0)];
        assert!(!engine.evaluate(&snap, toggles).fullscreen);
    }

    #[test]
    fn test_covers_screen_edges() {
        assert!(covers_screen(&SCREEN, &SCREEN));
        assert!(!covers_screen(&Rect::new(0.0, 0.0, 299.0, 900.0), &SCREEN));
        let small_screen = Rect::new(0.0, 0.0, 300.0, 300.0);
        assert!(covers_screen(&Rect::new(0.0, 0.0, 300.0, 300.0), &small_screen));
        assert!(!covers_screen(&SCREEN, &Rect::default()));
    }

    #[test]
    fn test_capture_skips_geometry_for_excluded_app() {
        let engine = AutoPauseEngine::new(None);
        let desktop = FakeDesktop::default();
        desktop.set_frontmost(Some(app(DESKTOP_SHELL_BUNDLE_ID)));
        desktop.set_windows(vec![SCREEN]);
        let toggles = AutoPauseToggles {
            on_fullscreen: true,
            in_background: true,
        };
        let snap = engine.capture(&desktop, toggles);
        assert!(snap.windows.is_empty());
        assert_eq!(desktop.window_queries(), 0);
        assert!(!engine.evaluate(&snap, toggles).is_active());
    }

    #[test]
    fn test_capture_reads_windows_of_front_app() {
        let engine = AutoPauseEngine::new(None);
        let desktop = FakeDesktop::default();
        desktop.set_frontmost(Some(app("com.apple.Terminal")));
        desktop.set_windows(vec![SCREEN]);
        let toggles = AutoPauseToggles {
            on_fullscreen: true,
            in_background: false,
        };
        let reason = engine.evaluate_probe(&desktop, toggles);
        assert!(reason.fullscreen);
        assert_eq!(desktop.window_queries(), 1);
    }
}
