//! xwall core engine: platform-agnostic logic for the video wallpaper.
//!
//! Placement, auto-pause and the playback state machine are decided here;
//! everything that touches the OS goes through `xwall-platform` traits.

pub mod auto_pause;
pub mod autostart;
pub mod config;
pub mod controller;
pub mod events;
pub mod pipeline;
pub mod placement;
pub mod playback;

#[cfg(test)]
pub(crate) mod testing;

pub use auto_pause::{AutoPauseEngine, AutoPauseReason, AutoPauseToggles, DesktopSnapshot};
pub use config::{ConfigError, Settings, SettingsStore};
pub use controller::{AppIdentity, Collaborators, WallpaperController};
pub use events::{DesktopEvent, Dispatcher, EventSender, Waker};
pub use playback::{PlaybackIntent, PlaybackState, PlayerCommand};
