//! Borderless `NSWindow` hosting an `AVPlayerLayer`.

use cocoa::base::{id, nil, BOOL, NO, YES};
use cocoa::foundation::{NSInteger, NSRect, NSUInteger};
use objc::{class, msg_send, sel, sel_impl};
use tracing::{debug, warn};
use xwall_platform::{
    CollectionBehavior, MediaPlayer, Rect, Result, SurfaceFactory, WallpaperSurface, WindowLevel,
};

use crate::ffi::{ns_string, to_ns_rect, to_rect};

#[link(name = "AVFoundation", kind = "framework")]
extern "C" {
    static AVLayerVideoGravityResizeAspectFill: id;
}

const BORDERLESS_STYLE: NSUInteger = 0;
const BACKING_BUFFERED: NSUInteger = 2;
const LAYER_WIDTH_SIZABLE: u32 = 1 << 1;
const LAYER_HEIGHT_SIZABLE: u32 = 1 << 4;

// NSWindowCollectionBehavior bits.
const JOIN_ALL_SPACES: NSUInteger = 1 << 0;
const STATIONARY: NSUInteger = 1 << 4;
const IGNORES_CYCLE: NSUInteger = 1 << 6;

fn encode_behavior(behavior: CollectionBehavior) -> NSUInteger {
    let mut bits = 0;
    if behavior.join_all_spaces {
        bits |= JOIN_ALL_SPACES;
    }
    if behavior.stationary {
        bits |= STATIONARY;
    }
    if behavior.ignores_cycle {
        bits |= IGNORES_CYCLE;
    }
    bits
}

fn decode_behavior(bits: NSUInteger) -> CollectionBehavior {
    CollectionBehavior {
        stationary: bits & STATIONARY != 0,
        ignores_cycle: bits & IGNORES_CYCLE != 0,
        join_all_spaces: bits & JOIN_ALL_SPACES != 0,
    }
}

pub struct MacSurfaceFactory;

impl SurfaceFactory for MacSurfaceFactory {
    fn create_surface(&mut self, frame: Rect) -> Result<Box<dyn WallpaperSurface>> {
        let surface = unsafe { MacSurface::new(frame) }?;
        Ok(Box::new(surface))
    }
}

pub struct MacSurface {
    window: id,
    player_layer: id,
}

impl MacSurface {
    unsafe fn new(frame: Rect) -> Result<Self> {
        let window: id = msg_send![class!(NSWindow), alloc];
        let window: id = msg_send![window,
            initWithContentRect: to_ns_rect(frame)
            styleMask: BORDERLESS_STYLE
            backing: BACKING_BUFFERED
            defer: NO];
        if window == nil {
            return Err("NSWindow allocation failed".into());
        }
        let _: () = msg_send![window, setReleasedWhenClosed: NO];
        let _: () = msg_send![window, setHasShadow: NO];
        let _: () = msg_send![window, setTitle: ns_string("Video Wallpaper")];

        let content: id = msg_send![window, contentView];
        if content != nil {
            let _: () = msg_send![content, setWantsLayer: YES];
        }
        debug!("surface window created at {frame:?}");
        Ok(Self {
            window,
            player_layer: nil,
        })
    }

    unsafe fn detach_layer(&mut self) {
        if self.player_layer != nil {
            let _: () = msg_send![self.player_layer, removeFromSuperlayer];
            let _: () = msg_send![self.player_layer, release];
            self.player_layer = nil;
        }
    }
}

impl WallpaperSurface for MacSurface {
    fn frame(&self) -> Rect {
        let frame: NSRect = unsafe { msg_send![self.window, frame] };
        to_rect(frame)
    }

    fn screen_frame(&self) -> Option<Rect> {
        unsafe {
            let screen: id = msg_send![self.window, screen];
            if screen == nil {
                return None;
            }
            let frame: NSRect = msg_send![screen, frame];
            Some(to_rect(frame))
        }
    }

    fn set_frame(&mut self, frame: Rect) {
        unsafe {
            let _: () = msg_send![self.window, setFrame: to_ns_rect(frame) display: YES animate: NO];
        }
    }

    fn level(&self) -> WindowLevel {
        let level: NSInteger = unsafe { msg_send![self.window, level] };
        WindowLevel(level as i64)
    }

    fn set_level(&mut self, level: WindowLevel) {
        unsafe {
            let _: () = msg_send![self.window, setLevel: level.0 as NSInteger];
        }
    }

    fn collection_behavior(&self) -> CollectionBehavior {
        let bits: NSUInteger = unsafe { msg_send![self.window, collectionBehavior] };
        decode_behavior(bits)
    }

    fn set_collection_behavior(&mut self, behavior: CollectionBehavior) {
        unsafe {
            let current: NSUInteger = msg_send![self.window, collectionBehavior];
            let bits = (current & !(JOIN_ALL_SPACES | STATIONARY | IGNORES_CYCLE))
                | encode_behavior(behavior);
            let _: () = msg_send![self.window, setCollectionBehavior: bits];
        }
    }

    fn ignores_mouse_events(&self) -> bool {
        let ignores: BOOL = unsafe { msg_send![self.window, ignoresMouseEvents] };
        ignores != NO
    }

    fn set_ignores_mouse_events(&mut self, ignores: bool) {
        let flag = if ignores { YES } else { NO };
        unsafe {
            let _: () = msg_send![self.window, setIgnoresMouseEvents: flag];
        }
    }

    fn is_opaque(&self) -> bool {
        let opaque: BOOL = unsafe { msg_send![self.window, isOpaque] };
        opaque != NO
    }

    fn set_opaque(&mut self, opaque: bool) {
        let flag = if opaque { YES } else { NO };
        unsafe {
            let _: () = msg_send![self.window, setOpaque: flag];
        }
    }

    fn has_clear_background(&self) -> bool {
        unsafe {
            let background: id = msg_send![self.window, backgroundColor];
            if background == nil {
                return false;
            }
            let clear: id = msg_send![class!(NSColor), clearColor];
            let equal: BOOL = msg_send![background, isEqual: clear];
            equal != NO
        }
    }

    fn set_clear_background(&mut self) {
        unsafe {
            let clear: id = msg_send![class!(NSColor), clearColor];
            let _: () = msg_send![self.window, setBackgroundColor: clear];
        }
    }

    fn is_visible(&self) -> bool {
        let visible: BOOL = unsafe { msg_send![self.window, isVisible] };
        visible != NO
    }

    fn order_front(&mut self) {
        unsafe {
            let _: () = msg_send![self.window, orderFrontRegardless];
        }
    }

    fn attach_player(&mut self, player: &dyn MediaPlayer) {
        let Some(handle) = player.native_handle() else {
            warn!("player has no native handle; nothing to attach");
            return;
        };
        unsafe {
            self.detach_layer();
            let content: id = msg_send![self.window, contentView];
            if content == nil {
                warn!("surface has no content view");
                return;
            }
            let root: id = msg_send![content, layer];
            if root == nil {
                warn!("surface content view is not layer-backed");
                return;
            }
            let layer: id = msg_send![class!(AVPlayerLayer), playerLayerWithPlayer: handle.0 as id];
            let layer: id = msg_send![layer, retain];
            let bounds: NSRect = msg_send![content, bounds];
            let _: () = msg_send![layer, setFrame: bounds];
            let _: () = msg_send![layer, setAutoresizingMask: LAYER_WIDTH_SIZABLE | LAYER_HEIGHT_SIZABLE];
            let _: () = msg_send![layer, setVideoGravity: AVLayerVideoGravityResizeAspectFill];
            let _: () = msg_send![root, addSublayer: layer];
            self.player_layer = layer;
        }
    }

    fn close(&mut self) {
        unsafe {
            self.detach_layer();
            let _: () = msg_send![self.window, orderOut: nil];
            let _: () = msg_send![self.window, close];
        }
    }
}

impl Drop for MacSurface {
    fn drop(&mut self) {
        unsafe {
            self.detach_layer();
            let _: () = msg_send![self.window, release];
        }
    }
}
