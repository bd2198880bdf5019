//! The wallpaper controller owns every piece of runtime state and is the
//! target of all user actions and desktop events.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};
use xwall_platform::{DesktopProbe, MediaBackend, SurfaceFactory, SystemShell, WallpaperSurface};

use crate::auto_pause::AutoPauseEngine;
use crate::autostart::{Autostart, AutostartOutcome, LaunchAgent};
use crate::config::{Settings, SettingsStore};
use crate::events::{DesktopEvent, Dispatcher};
use crate::pipeline::{self, LoadError, LoadOptions, LoadedSource};
use crate::placement::PlacementMonitor;
use crate::playback::{PlaybackState, PlayerCommand};

pub const STATUS_WAITING: &str = "Waiting for import";
pub const STATUS_LOADING: &str = "Loading…";
pub const STATUS_PLAYING: &str = "Playing";
pub const STATUS_PAUSED: &str = "Paused";
pub const STATUS_REMOVED: &str = "Removed";
pub const STATUS_SANDBOXED: &str =
    "Launch at login is unavailable in this build; add the app under System Settings → General → Login Items.";

const OPEN: &str = "/usr/bin/open";

/// The platform services the controller drives.
pub struct Collaborators {
    pub desktop: Box<dyn DesktopProbe>,
    pub surfaces: Box<dyn SurfaceFactory>,
    pub media: Box<dyn MediaBackend>,
    pub shell: Box<dyn SystemShell>,
}

/// Who the running process is, for self-exclusion and launch-at-login.
#[derive(Debug, Clone)]
pub struct AppIdentity {
    pub bundle_id: Option<String>,
    /// launchd label, usually the bundle id.
    pub label: String,
    pub executable: PathBuf,
    pub pid: i32,
    pub uid: u32,
    pub sandboxed: bool,
    pub agents_dir: Option<PathBuf>,
}

impl AppIdentity {
    pub fn launch_agent(&self) -> LaunchAgent {
        LaunchAgent::new(self.label.clone(), self.executable.clone())
    }
}

pub struct WallpaperController {
    store: SettingsStore,
    identity: AppIdentity,
    collab: Collaborators,
    engine: AutoPauseEngine,
    monitor: PlacementMonitor,
    playback: PlaybackState,
    surface: Option<Box<dyn WallpaperSurface>>,
    source: Option<LoadedSource>,
    status: String,
}

impl WallpaperController {
    pub fn new(store: SettingsStore, identity: AppIdentity, collab: Collaborators) -> Self {
        let engine =
            AutoPauseEngine::new(identity.bundle_id.as_deref()).with_own_pid(identity.pid);
        let monitor = PlacementMonitor::new(store.settings().monitor_interval());
        Self {
            store,
            identity,
            collab,
            engine,
            monitor,
            playback: PlaybackState::default(),
            surface: None,
            source: None,
            status: STATUS_WAITING.to_string(),
        }
    }

    /// Registers the standard event routing.
    pub fn subscribe_defaults(dispatcher: &mut Dispatcher<Self>) {
        dispatcher.subscribe(DesktopEvent::SpaceChanged, |c| c.place());
        dispatcher.subscribe(DesktopEvent::DisplayChanged, |c| c.place());
        dispatcher.subscribe(DesktopEvent::AppActivated, |c| c.evaluate_auto_pause());
        dispatcher.subscribe(DesktopEvent::ItemEnded, |c| c.item_ended());
        dispatcher.subscribe(DesktopEvent::Tick, |c| c.tick());
    }

    pub fn settings(&self) -> &Settings {
        self.store.settings()
    }

    pub fn settings_path(&self) -> &Path {
        self.store.path()
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn file_name(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.file_name.as_str())
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.monitor.next_deadline()
    }

    pub fn startup(&mut self, now: Instant) {
        let settings = self.store.settings().clone();
        if settings.launch_with_app {
            self.ensure_surface();
        }
        self.place();
        self.monitor.start(now);

        if let Some(path) = settings.last_video() {
            if path.exists() {
                let path = path.to_path_buf();
                info!("restoring {}", path.display());
                if let Err(err) = self.load(&path) {
                    warn!("cannot restore last video: {err}");
                }
            } else {
                debug!("last video {} is gone", path.display());
            }
        }

        // The executable may have moved since the agent was written.
        self.sync_autostart(settings.launch_at_login);
    }

    /// True when the monitor deadline has passed; the caller then delivers
    /// [`DesktopEvent::Tick`]. Advances the schedule.
    pub fn tick_due(&mut self, now: Instant) -> bool {
        self.monitor.poll_due(now)
    }

    /// One full monitor pass.
    pub fn tick(&mut self) {
        self.reload_settings_if_changed();
        self.place();
        self.evaluate_auto_pause();
    }

    pub fn place(&mut self) {
        let join = self.store.settings().join_all_spaces;
        if let Some(surface) = self.surface.as_deref_mut() {
            let report = self.monitor.place(surface, self.collab.desktop.as_ref(), join);
            if report.screen_missing {
                debug!("no screen for the surface this pass");
            }
        }
    }

    pub fn evaluate_auto_pause(&mut self) {
        let toggles = self.store.settings().auto_pause();
        let reason = self
            .engine
            .evaluate_probe(self.collab.desktop.as_ref(), toggles);
        let command = self.playback.set_reason(reason);
        self.apply(command);
    }

    pub fn item_ended(&mut self) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        self.playback.item_ended(source.player.as_mut());
        if self.playback.is_playing() {
            self.status = STATUS_PLAYING.to_string();
        }
    }

    /// Handles the result of the import dialog. `None` means cancelled.
    pub fn import(&mut self, picked: Option<&Path>) {
        match picked {
            Some(path) => {
                if let Err(err) = self.load(path) {
                    warn!("import failed: {err}");
                }
            }
            None => debug!("import cancelled"),
        }
    }

    pub fn load(&mut self, path: &Path) -> Result<(), LoadError> {
        self.status = STATUS_LOADING.to_string();
        let settings = self.store.settings();
        let options = LoadOptions {
            bounce: settings.enable_bounce,
            muted: settings.default_muted,
        };

        let source = match pipeline::load_source(self.collab.media.as_mut(), path, options) {
            Ok(source) => source,
            Err(err) => {
                self.status = format!("Failed to load {}", pipeline::file_name(path));
                return Err(err);
            }
        };

        let stop_old = self.playback.set_ready(false);
        self.apply(stop_old);
        if let Some(mut old) = self.source.take() {
            old.player.clear_source();
        }

        self.ensure_surface();
        if let Some(surface) = self.surface.as_deref_mut() {
            surface.attach_player(source.player.as_ref());
        }
        self.place();

        let name = source.file_name.clone();
        debug!(
            "{} ready: {:.2}s{}",
            source.path.display(),
            source.duration.as_secs_f64(),
            if source.bounce.is_some() { ", bounce" } else { "" }
        );
        self.source = Some(source);
        // The reason is current before the new player may start.
        self.evaluate_auto_pause();
        let command = self.playback.set_ready(true);
        self.apply(command);
        self.status = format!("Ready: {name}");

        let stored = path.to_string_lossy().into_owned();
        if let Err(err) = self.store.update(|s| s.last_video_path = stored) {
            warn!("cannot remember last video: {err}");
        }
        Ok(())
    }

    pub fn toggle_play(&mut self) {
        let command = self.playback.toggle();
        self.apply(command);
        self.status = if self.playback.is_playing() {
            STATUS_PLAYING
        } else {
            STATUS_PAUSED
        }
        .to_string();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.update_settings(|s| s.default_muted = muted);
    }

    pub fn toggle_mute(&mut self) {
        let muted = !self.store.settings().default_muted;
        self.set_muted(muted);
    }

    pub fn remove_wallpaper(&mut self) {
        let command = self.playback.set_ready(false);
        self.apply(command);
        if let Some(mut source) = self.source.take() {
            source.player.clear_source();
            info!("removed {}", source.file_name);
        }
        if let Some(mut surface) = self.surface.take() {
            surface.close();
        }
        self.status = STATUS_REMOVED.to_string();
    }

    /// Stops the monitor schedule and the player. The surface goes away
    /// with the process.
    pub fn shutdown(&mut self) {
        self.monitor.stop();
        let command = self.playback.set_ready(false);
        self.apply(command);
        info!("controller shut down");
    }

    /// Mutates the settings, persists them and re-applies what changed.
    pub fn update_settings<F>(&mut self, change: F)
    where
        F: FnOnce(&mut Settings),
    {
        let previous = self.store.settings().clone();
        if let Err(err) = self.store.update(change) {
            warn!("cannot save settings: {err}");
        }
        self.apply_settings_change(&previous);
    }

    /// Picks up edits made to the settings file outside the app.
    pub fn reload_settings_if_changed(&mut self) {
        match self.store.reload_if_changed() {
            Ok(Some(previous)) => self.apply_settings_change(&previous),
            Ok(None) => {}
            Err(err) => warn!("cannot reload settings: {err}"),
        }
    }

    /// Opens the settings file in the default text editor.
    pub fn show_panel(&mut self) {
        if !self.store.path().exists() {
            if let Err(err) = self.store.save() {
                warn!("cannot create settings file: {err}");
                return;
            }
        }
        let args = vec![
            "-t".to_string(),
            self.store.path().to_string_lossy().into_owned(),
        ];
        match self.collab.shell.run(OPEN, &args) {
            Ok(0) => {}
            Ok(code) => warn!("open exited with {code}"),
            Err(err) => warn!("cannot open settings: {err}"),
        }
    }

    fn apply_settings_change(&mut self, previous: &Settings) {
        let current = self.store.settings().clone();
        if current.monitor_interval != previous.monitor_interval {
            self.monitor
                .set_interval(current.monitor_interval(), Instant::now());
        }
        if current.join_all_spaces != previous.join_all_spaces {
            self.place();
        }
        if current.auto_pause() != previous.auto_pause() {
            self.evaluate_auto_pause();
        }
        if current.default_muted != previous.default_muted {
            if let Some(source) = self.source.as_mut() {
                source.player.set_muted(current.default_muted);
            }
        }
        if current.launch_at_login != previous.launch_at_login {
            self.sync_autostart(current.launch_at_login);
        }
    }

    fn sync_autostart(&mut self, enabled: bool) {
        let agent = self.identity.launch_agent();
        let autostart = Autostart {
            agent: &agent,
            agents_dir: self.identity.agents_dir.as_deref(),
            uid: self.identity.uid,
            sandboxed: self.identity.sandboxed,
            shell: self.collab.shell.as_ref(),
        };
        match autostart.apply(enabled) {
            Ok(AutostartOutcome::SandboxRedirect) => self.status = STATUS_SANDBOXED.to_string(),
            Ok(outcome) => debug!("autostart: {outcome:?}"),
            Err(err) => {
                warn!("autostart failed: {err}");
                self.status = format!("Failed to set launch at login: {err}");
            }
        }
    }

    fn ensure_surface(&mut self) {
        if self.surface.is_some() {
            return;
        }
        let frame = self.collab.desktop.main_screen_frame().unwrap_or_default();
        match self.collab.surfaces.create_surface(frame) {
            Ok(surface) => {
                info!("wallpaper surface created");
                self.surface = Some(surface);
            }
            Err(err) => warn!("cannot create wallpaper surface: {err}"),
        }
    }

    fn apply(&mut self, command: Option<PlayerCommand>) {
        let Some(command) = command else {
            return;
        };
        if let Some(source) = self.source.as_mut() {
            command.apply(source.player.as_mut());
        }
        self.status = match command {
            PlayerCommand::Play => STATUS_PLAYING,
            PlayerCommand::Pause => STATUS_PAUSED,
        }
        .to_string();
        debug!("player {command:?} (auto-pause: {})", self.playback.reason());
    }
}
