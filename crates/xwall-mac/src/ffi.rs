//! Small Cocoa helpers shared by the backends.

use std::ffi::CStr;

use cocoa::base::{id, nil};
use cocoa::foundation::{NSPoint, NSRect, NSSize, NSString};
use objc::{msg_send, sel, sel_impl};
use xwall_platform::Rect;

/// Autoreleased `NSString`.
pub(crate) unsafe fn ns_string(value: &str) -> id {
    let string = NSString::alloc(nil).init_str(value);
    msg_send![string, autorelease]
}

pub(crate) unsafe fn to_string(value: id) -> Option<String> {
    if value == nil {
        return None;
    }
    let ptr = NSString::UTF8String(value);
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

pub(crate) fn to_rect(frame: NSRect) -> Rect {
    Rect::new(
        frame.origin.x,
        frame.origin.y,
        frame.size.width,
        frame.size.height,
    )
}

pub(crate) fn to_ns_rect(rect: Rect) -> NSRect {
    NSRect::new(
        NSPoint::new(rect.x, rect.y),
        NSSize::new(rect.width, rect.height),
    )
}

#[inline]
pub(crate) fn box_err<E: std::error::Error + Send + Sync + 'static>(
    e: E,
) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(e)
}
