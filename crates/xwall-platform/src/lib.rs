//! Platform abstraction traits so `xwall-core` stays OS-agnostic.
//!
//! Every trait here is a black box over a desktop query or a window/media
//! call. The macOS implementations live in `xwall-mac`; the core crate
//! drives them and its tests substitute fakes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Rectangle in screen points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Raw window level as understood by the window server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowLevel(pub i64);

/// Which spaces the surface lives on and how the window cycler treats it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionBehavior {
    pub stationary: bool,
    pub ignores_cycle: bool,
    pub join_all_spaces: bool,
}

/// The application currently in front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForegroundApp {
    pub bundle_id: Option<String>,
    pub pid: i32,
}

/// Opaque pointer-sized handle to a native object (player, asset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeHandle(pub usize);

/// One range of the source placed on the composition timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionSegment {
    pub source_start: Duration,
    pub duration: Duration,
    pub at: Duration,
}

/// Read-only queries against the desktop. Every query is best-effort:
/// `None` or an empty list means "unknown right now".
pub trait DesktopProbe {
    fn main_screen_frame(&self) -> Option<Rect>;
    fn frontmost_app(&self) -> Option<ForegroundApp>;
    /// Native fullscreen flag of the app's focused window. `false` when
    /// accessibility access is missing.
    fn is_native_fullscreen(&self, app: &ForegroundApp) -> bool;
    /// Frames of the on-screen windows owned by `pid`.
    fn window_frames(&self, pid: i32) -> Vec<Rect>;
    fn desktop_level(&self) -> WindowLevel;
    fn desktop_icon_level(&self) -> WindowLevel;
}

/// The borderless window presenting the video.
pub trait WallpaperSurface {
    fn frame(&self) -> Rect;
    /// Frame of the screen the surface currently sits on, if any.
    fn screen_frame(&self) -> Option<Rect>;
    fn set_frame(&mut self, frame: Rect);

    fn level(&self) -> WindowLevel;
    fn set_level(&mut self, level: WindowLevel);

    fn collection_behavior(&self) -> CollectionBehavior;
    fn set_collection_behavior(&mut self, behavior: CollectionBehavior);

    fn ignores_mouse_events(&self) -> bool;
    fn set_ignores_mouse_events(&mut self, ignores: bool);

    fn is_opaque(&self) -> bool;
    fn set_opaque(&mut self, opaque: bool);

    fn has_clear_background(&self) -> bool;
    fn set_clear_background(&mut self);

    fn is_visible(&self) -> bool;
    fn order_front(&mut self);

    fn attach_player(&mut self, player: &dyn MediaPlayer);
    fn close(&mut self);
}

/// Creates surfaces on demand.
pub trait SurfaceFactory {
    fn create_surface(&mut self, frame: Rect) -> Result<Box<dyn WallpaperSurface>>;
}

/// Opaque playback capability. End-of-item is reported by the backend
/// out of band, through the event queue.
pub trait MediaPlayer {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, to: Duration);
    fn set_muted(&mut self, muted: bool);
    fn clear_source(&mut self);
    fn native_handle(&self) -> Option<NativeHandle>;
}

/// An opened media file or a composition built from one.
pub trait MediaAsset {
    fn is_playable(&self) -> Result<bool>;
    /// Primary duration in seconds. May be zero, negative or NaN for
    /// streams whose container does not report one.
    fn duration_seconds(&self) -> Result<f64>;
    /// Time-range duration of the first video-bearing track.
    fn video_track_seconds(&self) -> Result<Option<f64>>;
    fn native_handle(&self) -> Option<NativeHandle>;
}

/// Opens assets, builds compositions and players.
pub trait MediaBackend {
    fn open(&mut self, path: &Path) -> Result<Box<dyn MediaAsset>>;
    fn compose(
        &mut self,
        source: &dyn MediaAsset,
        segments: &[CompositionSegment],
    ) -> Result<Box<dyn MediaAsset>>;
    fn create_player(&mut self, asset: &dyn MediaAsset, muted: bool)
        -> Result<Box<dyn MediaPlayer>>;
}

/// Process and URL launching.
pub trait SystemShell {
    /// Runs `program` to completion and returns its exit status.
    fn run(&self, program: &str, args: &[String]) -> Result<i32>;
    /// Opens a URL or a file with the default handler.
    fn open(&self, target: &str) -> Result<()>;
}
