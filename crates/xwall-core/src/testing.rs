//! In-memory collaborators for unit tests. Each fake shares its state
//! through `Rc<RefCell<_>>` so a test can keep a handle after moving a
//! clone into the controller.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use xwall_platform::{
    CollectionBehavior, CompositionSegment, DesktopProbe, ForegroundApp, MediaAsset, MediaBackend,
    MediaPlayer, NativeHandle, Rect, Result, SurfaceFactory, SystemShell, WallpaperSurface,
    WindowLevel,
};

#[derive(Debug, Clone)]
struct DesktopState {
    screen: Option<Rect>,
    frontmost: Option<ForegroundApp>,
    native_fullscreen: bool,
    windows: Vec<Rect>,
    window_queries: usize,
    desktop_level: WindowLevel,
    icon_level: WindowLevel,
}

#[derive(Clone)]
pub struct FakeDesktop(Rc<RefCell<DesktopState>>);

impl Default for FakeDesktop {
    fn default() -> Self {
        Self(Rc::new(RefCell::new(DesktopState {
            screen: Some(Rect::new(0.0, 0.0, 1440.0, 900.0)),
            frontmost: None,
            native_fullscreen: false,
            windows: Vec::new(),
            window_queries: 0,
            desktop_level: WindowLevel(-20),
            icon_level: WindowLevel(0),
        })))
    }
}

impl FakeDesktop {
    pub fn screen(&self) -> Option<Rect> {
        self.0.borrow().screen
    }

    pub fn set_screen(&self, screen: Option<Rect>) {
        self.0.borrow_mut().screen = screen;
    }

    pub fn set_frontmost(&self, app: Option<ForegroundApp>) {
        self.0.borrow_mut().frontmost = app;
    }

    pub fn set_native_fullscreen(&self, fullscreen: bool) {
        self.0.borrow_mut().native_fullscreen = fullscreen;
    }

    pub fn set_windows(&self, windows: Vec<Rect>) {
        self.0.borrow_mut().windows = windows;
    }

    pub fn window_queries(&self) -> usize {
        self.0.borrow().window_queries
    }
}

impl DesktopProbe for FakeDesktop {
    fn main_screen_frame(&self) -> Option<Rect> {
        self.0.borrow().screen
    }

    fn frontmost_app(&self) -> Option<ForegroundApp> {
        self.0.borrow().frontmost.clone()
    }

    fn is_native_fullscreen(&self, _app: &ForegroundApp) -> bool {
        self.0.borrow().native_fullscreen
    }

    fn window_frames(&self, _pid: i32) -> Vec<Rect> {
        let mut state = self.0.borrow_mut();
        state.window_queries += 1;
        state.windows.clone()
    }

    fn desktop_level(&self) -> WindowLevel {
        self.0.borrow().desktop_level
    }

    fn desktop_icon_level(&self) -> WindowLevel {
        self.0.borrow().icon_level
    }
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceState {
    pub frame: Rect,
    pub level: WindowLevel,
    pub behavior: CollectionBehavior,
    pub ignores_mouse: bool,
    pub opaque: bool,
    pub clear_background: bool,
    pub visible: bool,
    /// Setter calls that reached the surface.
    pub mutations: u32,
    pub attached: Vec<Option<NativeHandle>>,
    pub closed: bool,
}

#[derive(Clone)]
pub struct FakeSurface(Rc<RefCell<SurfaceState>>);

impl FakeSurface {
    pub fn new(frame: Rect) -> Self {
        Self(Rc::new(RefCell::new(SurfaceState {
            frame,
            ..SurfaceState::default()
        })))
    }

    pub fn state(&self) -> SurfaceState {
        self.0.borrow().clone()
    }

    fn mutate(&self, change: impl FnOnce(&mut SurfaceState)) {
        let mut state = self.0.borrow_mut();
        change(&mut state);
        state.mutations += 1;
    }
}

impl WallpaperSurface for FakeSurface {
    fn frame(&self) -> Rect {
        self.0.borrow().frame
    }

    fn screen_frame(&self) -> Option<Rect> {
        None
    }

    fn set_frame(&mut self, frame: Rect) {
        self.mutate(|s| s.frame = frame);
    }

    fn level(&self) -> WindowLevel {
        self.0.borrow().level
    }

    fn set_level(&mut self, level: WindowLevel) {
        self.mutate(|s| s.level = level);
    }

    fn collection_behavior(&self) -> CollectionBehavior {
        self.0.borrow().behavior
    }

    fn set_collection_behavior(&mut self, behavior: CollectionBehavior) {
        self.mutate(|s| s.behavior = behavior);
    }

    fn ignores_mouse_events(&self) -> bool {
        self.0.borrow().ignores_mouse
    }

    fn set_ignores_mouse_events(&mut self, ignores: bool) {
        self.mutate(|s| s.ignores_mouse = ignores);
    }

    fn is_opaque(&self) -> bool {
        self.0.borrow().opaque
    }

    fn set_opaque(&mut self, opaque: bool) {
        self.mutate(|s| s.opaque = opaque);
    }

    fn has_clear_background(&self) -> bool {
        self.0.borrow().clear_background
    }

    fn set_clear_background(&mut self) {
        self.mutate(|s| s.clear_background = true);
    }

    fn is_visible(&self) -> bool {
        self.0.borrow().visible
    }

    fn order_front(&mut self) {
        self.mutate(|s| s.visible = true);
    }

    fn attach_player(&mut self, player: &dyn MediaPlayer) {
        let handle = player.native_handle();
        self.0.borrow_mut().attached.push(handle);
    }

    fn close(&mut self) {
        let mut state = self.0.borrow_mut();
        state.closed = true;
        state.visible = false;
    }
}

#[derive(Clone, Default)]
pub struct FakeSurfaceFactory {
    created: Rc<RefCell<Vec<FakeSurface>>>,
}

impl FakeSurfaceFactory {
    pub fn created(&self) -> usize {
        self.created.borrow().len()
    }

    pub fn last(&self) -> Option<FakeSurface> {
        self.created.borrow().last().cloned()
    }
}

impl SurfaceFactory for FakeSurfaceFactory {
    fn create_surface(&mut self, frame: Rect) -> Result<Box<dyn WallpaperSurface>> {
        let surface = FakeSurface::new(frame);
        self.created.borrow_mut().push(surface.clone());
        Ok(Box::new(surface))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerCall {
    Play,
    Pause,
    Seek(Duration),
    Mute(bool),
    Clear,
}

#[derive(Debug, Clone, Default)]
pub struct MediaLog {
    pub opened: Vec<PathBuf>,
    /// Effective duration and mute flag of every player built.
    pub players: Vec<(f64, bool)>,
    pub compositions: Vec<Vec<CompositionSegment>>,
    pub calls: Vec<PlayerCall>,
}

impl MediaLog {
    pub fn count(&self, call: PlayerCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FakeAsset {
    primary: f64,
    track: Option<f64>,
}

impl FakeAsset {
    pub fn new(primary: f64, track: Option<f64>) -> Self {
        Self { primary, track }
    }
}

impl MediaAsset for FakeAsset {
    fn is_playable(&self) -> Result<bool> {
        Ok(true)
    }

    fn duration_seconds(&self) -> Result<f64> {
        Ok(self.primary)
    }

    fn video_track_seconds(&self) -> Result<Option<f64>> {
        Ok(self.track)
    }

    fn native_handle(&self) -> Option<NativeHandle> {
        None
    }
}

pub struct FakePlayer {
    id: usize,
    log: Rc<RefCell<MediaLog>>,
}

impl MediaPlayer for FakePlayer {
    fn play(&mut self) {
        self.log.borrow_mut().calls.push(PlayerCall::Play);
    }

    fn pause(&mut self) {
        self.log.borrow_mut().calls.push(PlayerCall::Pause);
    }

    fn seek(&mut self, to: Duration) {
        self.log.borrow_mut().calls.push(PlayerCall::Seek(to));
    }

    fn set_muted(&mut self, muted: bool) {
        self.log.borrow_mut().calls.push(PlayerCall::Mute(muted));
    }

    fn clear_source(&mut self) {
        self.log.borrow_mut().calls.push(PlayerCall::Clear);
    }

    fn native_handle(&self) -> Option<NativeHandle> {
        Some(NativeHandle(self.id))
    }
}

#[derive(Clone, Default)]
pub struct FakeMedia {
    assets: HashMap<PathBuf, FakeAsset>,
    pub fail_compose: bool,
    log: Rc<RefCell<MediaLog>>,
}

impl FakeMedia {
    pub fn add(&mut self, path: impl Into<PathBuf>, asset: FakeAsset) {
        self.assets.insert(path.into(), asset);
    }

    pub fn log(&self) -> MediaLog {
        self.log.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.log.borrow_mut().calls.clear();
    }
}

impl MediaBackend for FakeMedia {
    fn open(&mut self, path: &Path) -> Result<Box<dyn MediaAsset>> {
        self.log.borrow_mut().opened.push(path.to_path_buf());
        match self.assets.get(path) {
            Some(asset) => Ok(Box::new(*asset)),
            None => Err(format!("{} does not exist", path.display()).into()),
        }
    }

    fn compose(
        &mut self,
        _source: &dyn MediaAsset,
        segments: &[CompositionSegment],
    ) -> Result<Box<dyn MediaAsset>> {
        if self.fail_compose {
            return Err("composition failed".into());
        }
        self.log.borrow_mut().compositions.push(segments.to_vec());
        let total = segments
            .iter()
            .map(|s| s.at + s.duration)
            .max()
            .unwrap_or_default();
        Ok(Box::new(FakeAsset::new(total.as_secs_f64(), None)))
    }

    fn create_player(&mut self, asset: &dyn MediaAsset, muted: bool) -> Result<Box<dyn MediaPlayer>> {
        let primary = asset.duration_seconds()?;
        let effective = if primary > 0.0 {
            primary
        } else {
            asset.video_track_seconds()?.unwrap_or(0.0)
        };
        let mut log = self.log.borrow_mut();
        log.players.push((effective, muted));
        Ok(Box::new(FakePlayer {
            id: log.players.len(),
            log: Rc::clone(&self.log),
        }))
    }
}

#[derive(Debug, Clone, Default)]
struct ShellLog {
    runs: Vec<(String, Vec<String>)>,
    opened: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeShell(Rc<RefCell<ShellLog>>);

impl FakeShell {
    pub fn runs(&self) -> Vec<(String, Vec<String>)> {
        self.0.borrow().runs.clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.0.borrow().opened.clone()
    }
}

impl SystemShell for FakeShell {
    fn run(&self, program: &str, args: &[String]) -> Result<i32> {
        self.0
            .borrow_mut()
            .runs
            .push((program.to_string(), args.to_vec()));
        Ok(0)
    }

    fn open(&self, target: &str) -> Result<()> {
        self.0.borrow_mut().opened.push(target.to_string());
        Ok(())
    }
}
