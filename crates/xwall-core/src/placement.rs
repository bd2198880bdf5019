//! Desktop placement monitor: keeps the surface pinned full-screen between
//! the desktop background and the desktop icons.

use std::time::{Duration, Instant};

use tracing::{debug, trace};
use xwall_platform::{CollectionBehavior, DesktopProbe, WallpaperSurface, WindowLevel};

/// Midpoint between the desktop background level and the icon level.
pub fn icon_midpoint_level(desktop: WindowLevel, icons: WindowLevel) -> WindowLevel {
    WindowLevel(desktop.0 + (icons.0 - desktop.0) / 2)
}

pub fn desired_behavior(join_all_spaces: bool) -> CollectionBehavior {
    CollectionBehavior {
        stationary: true,
        ignores_cycle: true,
        join_all_spaces,
    }
}

/// What one placement pass had to change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementReport {
    pub screen_missing: bool,
    pub changes: u32,
}

/// Placement plus the fixed-interval schedule it runs on.
pub struct PlacementMonitor {
    interval: Duration,
    next_due: Option<Instant>,
}

impl PlacementMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    /// Starts (or restarts) the schedule one interval from `now`.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        if interval == self.interval {
            return;
        }
        debug!("monitor interval {:?} -> {:?}", self.interval, interval);
        self.interval = interval;
        if self.next_due.is_some() {
            self.start(now);
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_due
    }

    /// True once per elapsed deadline; advances the schedule.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }

    /// Re-asserts geometry, level and behaviour, touching only what differs.
    pub fn place(
        &self,
        surface: &mut dyn WallpaperSurface,
        probe: &dyn DesktopProbe,
        join_all_spaces: bool,
    ) -> PlacementReport {
        let mut report = PlacementReport::default();

        match surface.screen_frame().or_else(|| probe.main_screen_frame()) {
            Some(screen) => {
                if surface.frame() != screen {
                    trace!("surface frame {:?} -> {:?}", surface.frame(), screen);
                    surface.set_frame(screen);
                    report.changes += 1;
                }
            }
            None => report.screen_missing = true,
        }

        let level = icon_midpoint_level(probe.desktop_level(), probe.desktop_icon_level());
        if surface.level() != level {
            trace!("surface level {:?} -> {:?}", surface.level(), level);
            surface.set_level(level);
            report.changes += 1;
        }

        let behavior = desired_behavior(join_all_spaces);
        if surface.collection_behavior() != behavior {
            surface.set_collection_behavior(behavior);
            report.changes += 1;
        }
        if !surface.ignores_mouse_events() {
            surface.set_ignores_mouse_events(true);
            report.changes += 1;
        }
        if !surface.is_opaque() {
            surface.set_opaque(true);
            report.changes += 1;
        }
        if !surface.has_clear_background() {
            surface.set_clear_background();
            report.changes += 1;
        }
        if !surface.is_visible() {
            surface.order_front();
            report.changes += 1;
        }

        if report.changes > 0 {
            debug!("placement reasserted ({} changes)", report.changes);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDesktop, FakeSurface};
    use xwall_platform::Rect;

    #[test]
    fn test_midpoint_level() {
        // CoreGraphics desktop and desktop-icon levels.
        let level = icon_midpoint_level(WindowLevel(-2147483623), WindowLevel(-2147483603));
        assert_eq!(level, WindowLevel(-2147483613));
        assert_eq!(
            icon_midpoint_level(WindowLevel(0), WindowLevel(5)),
            WindowLevel(2)
        );
    }

    #[test]
    fn test_first_pass_applies_everything() {
        let desktop = FakeDesktop::default();
        let mut surface = FakeSurface::new(Rect::new(0.0, 0.0, 800.0, 600.0));
        let monitor = PlacementMonitor::new(Duration::from_secs(1));

        let report = monitor.place(&mut surface, &desktop, true);
        assert_eq!(report.changes, 7);
        assert_eq!(surface.state().frame, desktop.screen().unwrap());
        assert_eq!(
            surface.state().level,
            icon_midpoint_level(desktop.desktop_level(), desktop.desktop_icon_level())
        );
        assert!(surface.state().behavior.join_all_spaces);
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let desktop = FakeDesktop::default();
        let mut surface = FakeSurface::new(Rect::default());
        let monitor = PlacementMonitor::new(Duration::from_secs(1));

        monitor.place(&mut surface, &desktop, false);
        let mutations = surface.state().mutations;
        let report = monitor.place(&mut surface, &desktop, false);
        assert_eq!(report.changes, 0);
        assert_eq!(surface.state().mutations, mutations);
    }

    #[test]
    fn test_display_change_resizes_only() {
        let desktop = FakeDesktop::default();
        let mut surface = FakeSurface::new(Rect::default());
        let monitor = PlacementMonitor::new(Duration::from_secs(1));
        monitor.place(&mut surface, &desktop, true);

        desktop.set_screen(Some(Rect::new(0.0, 0.0, 2560.0, 1440.0)));
        let report = monitor.place(&mut surface, &desktop, true);
        assert_eq!(report.changes, 1);
        assert_eq!(surface.state().frame.width, 2560.0);
    }

    #[test]
    fn test_missing_screen_keeps_frame() {
        let desktop = FakeDesktop::default();
        desktop.set_screen(None);
        let mut surface = FakeSurface::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        let monitor = PlacementMonitor::new(Duration::from_secs(1));

        let report = monitor.place(&mut surface, &desktop, true);
        assert!(report.screen_missing);
        assert_eq!(surface.state().frame, Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_schedule() {
        let start = Instant::now();
        let mut monitor = PlacementMonitor::new(Duration::from_millis(500));
        assert!(!monitor.poll_due(start));

        monitor.start(start);
        assert!(!monitor.poll_due(start + Duration::from_millis(100)));
        assert!(monitor.poll_due(start + Duration::from_millis(500)));
        assert!(!monitor.poll_due(start + Duration::from_millis(600)));

        monitor.set_interval(Duration::from_secs(2), start);
        assert_eq!(monitor.next_deadline(), Some(start + Duration::from_secs(2)));

        monitor.stop();
        assert!(monitor.next_deadline().is_none());
    }
}
