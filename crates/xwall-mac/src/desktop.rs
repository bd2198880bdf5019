//! Desktop queries: screens, the frontmost app, its windows and the
//! desktop window levels.

use std::cell::Cell;
use std::ffi::c_void;

use cocoa::base::{id, nil};
use cocoa::foundation::NSRect;
use core_foundation::array::CFArray;
use core_foundation::base::{CFType, CFTypeRef, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
use core_foundation::number::CFNumber;
use core_foundation::string::{CFString, CFStringRef};
use core_graphics::geometry::{CGPoint, CGRect, CGSize};
use core_graphics::window::{
    kCGNullWindowID, kCGWindowListExcludeDesktopElements, kCGWindowListOptionOnScreenOnly,
    CGWindowListCopyWindowInfo,
};
use objc::{class, msg_send, sel, sel_impl};
use tracing::{debug, info, warn};
use xwall_platform::{DesktopProbe, ForegroundApp, Rect, WindowLevel};

use crate::ffi::{to_rect, to_string};

type AXUIElementRef = CFTypeRef;
const AX_SUCCESS: i32 = 0;

const DESKTOP_WINDOW_LEVEL_KEY: i32 = 2;
const DESKTOP_ICON_WINDOW_LEVEL_KEY: i32 = 18;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    static kAXTrustedCheckOptionPrompt: CFStringRef;
    fn AXIsProcessTrusted() -> bool;
    fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
    fn AXUIElementCreateApplication(pid: i32) -> AXUIElementRef;
    fn AXUIElementCopyAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        value: *mut CFTypeRef,
    ) -> i32;
}

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGWindowLevelForKey(key: i32) -> i32;
    fn CGRectMakeWithDictionaryRepresentation(dict: *const c_void, rect: *mut CGRect) -> bool;
}

/// Asks for accessibility access once, showing the system prompt when it
/// is missing. Native fullscreen detection needs it.
pub fn request_accessibility() -> bool {
    unsafe {
        let key = CFString::wrap_under_get_rule(kAXTrustedCheckOptionPrompt);
        let options = CFDictionary::from_CFType_pairs(&[(
            key.as_CFType(),
            CFBoolean::true_value().as_CFType(),
        )]);
        let trusted = AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef());
        info!("accessibility access: {trusted}");
        trusted
    }
}

#[derive(Default)]
pub struct MacDesktop {
    warned_untrusted: Cell<bool>,
}

impl MacDesktop {
    fn copy_attribute(element: AXUIElementRef, name: &'static str) -> Option<CFType> {
        let attribute = CFString::from_static_string(name);
        let mut value: CFTypeRef = std::ptr::null();
        let status = unsafe {
            AXUIElementCopyAttributeValue(element, attribute.as_concrete_TypeRef(), &mut value)
        };
        if status != AX_SUCCESS || value.is_null() {
            return None;
        }
        Some(unsafe { CFType::wrap_under_create_rule(value) })
    }
}

impl DesktopProbe for MacDesktop {
    fn main_screen_frame(&self) -> Option<Rect> {
        unsafe {
            let screen: id = msg_send![class!(NSScreen), mainScreen];
            if screen == nil {
                return None;
            }
            let frame: NSRect = msg_send![screen, frame];
            Some(to_rect(frame))
        }
    }

    fn frontmost_app(&self) -> Option<ForegroundApp> {
        unsafe {
            let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
            let app: id = msg_send![workspace, frontmostApplication];
            if app == nil {
                return None;
            }
            let bundle_id: id = msg_send![app, bundleIdentifier];
            let pid: i32 = msg_send![app, processIdentifier];
            Some(ForegroundApp {
                bundle_id: to_string(bundle_id),
                pid,
            })
        }
    }

    fn is_native_fullscreen(&self, app: &ForegroundApp) -> bool {
        if !unsafe { AXIsProcessTrusted() } {
            if !self.warned_untrusted.replace(true) {
                warn!("accessibility access not granted; native fullscreen cannot be detected");
            }
            return false;
        }
        let element = unsafe { AXUIElementCreateApplication(app.pid) };
        if element.is_null() {
            return false;
        }
        let application = unsafe { CFType::wrap_under_create_rule(element) };
        let Some(window) = Self::copy_attribute(application.as_CFTypeRef(), "AXFocusedWindow")
        else {
            return false;
        };
        Self::copy_attribute(window.as_CFTypeRef(), "AXFullScreen")
            .and_then(|value| value.downcast::<CFBoolean>())
            .map(bool::from)
            .unwrap_or(false)
    }

    fn window_frames(&self, pid: i32) -> Vec<Rect> {
        let options = kCGWindowListOptionOnScreenOnly | kCGWindowListExcludeDesktopElements;
        let list = unsafe { CGWindowListCopyWindowInfo(options, kCGNullWindowID) };
        if list.is_null() {
            debug!("window list unavailable");
            return Vec::new();
        }
        let windows: CFArray<CFDictionary<CFString, CFType>> =
            unsafe { CFArray::wrap_under_create_rule(list) };

        windows
            .iter()
            .filter(|window| get_number_value(window, "kCGWindowOwnerPID") == Some(i64::from(pid)))
            .filter_map(|window| get_bounds(&window))
            .collect()
    }

    fn desktop_level(&self) -> WindowLevel {
        WindowLevel(i64::from(unsafe { CGWindowLevelForKey(DESKTOP_WINDOW_LEVEL_KEY) }))
    }

    fn desktop_icon_level(&self) -> WindowLevel {
        WindowLevel(i64::from(unsafe {
            CGWindowLevelForKey(DESKTOP_ICON_WINDOW_LEVEL_KEY)
        }))
    }
}

fn get_number_value(dict: &CFDictionary<CFString, CFType>, key: &'static str) -> Option<i64> {
    let key = CFString::from_static_string(key);
    dict.find(&key)
        .and_then(|value| value.downcast::<CFNumber>())
        .and_then(|number| number.to_i64())
}

fn get_bounds(dict: &CFDictionary<CFString, CFType>) -> Option<Rect> {
    let key = CFString::from_static_string("kCGWindowBounds");
    dict.find(&key).and_then(|bounds| {
        let mut rect = CGRect::new(&CGPoint::new(0.0, 0.0), &CGSize::new(0.0, 0.0));
        let ok = unsafe {
            CGRectMakeWithDictionaryRepresentation(bounds.as_CFTypeRef(), &mut rect)
        };
        ok.then(|| {
            Rect::new(
                rect.origin.x,
                rect.origin.y,
                rect.size.width,
                rect.size.height,
            )
        })
    })
}
