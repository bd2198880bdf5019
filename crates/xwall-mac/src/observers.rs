//! Notification observers that turn AppKit/AVFoundation notifications into
//! queued desktop events.

use cocoa::base::{id, nil};
use objc::declare::ClassDecl;
use objc::runtime::{Class, Object, Sel};
use objc::{class, msg_send, sel, sel_impl};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};
use xwall_core::{DesktopEvent, EventSender};

use crate::ffi::ns_string;

const OBSERVER_CLASS: &str = "XWallDesktopObserver";
const ACTIVE_SPACE_CHANGED: &str = "NSWorkspaceActiveSpaceDidChangeNotification";
const APP_ACTIVATED: &str = "NSWorkspaceDidActivateApplicationNotification";
const SCREEN_PARAMETERS_CHANGED: &str = "NSApplicationDidChangeScreenParametersNotification";
const ITEM_PLAYED_TO_END: &str = "AVPlayerItemDidPlayToEndTimeNotification";

static EVENTS: OnceCell<EventSender> = OnceCell::new();
/// The shared observer instance, stored as an address.
static OBSERVER: OnceCell<usize> = OnceCell::new();

fn emit(event: DesktopEvent) {
    match EVENTS.get() {
        Some(events) => events.send(event),
        None => debug!("{event:?} before observers were installed"),
    }
}

extern "C" fn space_changed(_this: &Object, _cmd: Sel, _notification: id) {
    emit(DesktopEvent::SpaceChanged);
}

extern "C" fn app_activated(_this: &Object, _cmd: Sel, _notification: id) {
    emit(DesktopEvent::AppActivated);
}

extern "C" fn screen_changed(_this: &Object, _cmd: Sel, _notification: id) {
    emit(DesktopEvent::DisplayChanged);
}

extern "C" fn item_ended(_this: &Object, _cmd: Sel, _notification: id) {
    emit(DesktopEvent::ItemEnded);
}

fn observer_class() -> Option<&'static Class> {
    if let Some(existing) = Class::get(OBSERVER_CLASS) {
        return Some(existing);
    }
    let mut decl = ClassDecl::new(OBSERVER_CLASS, class!(NSObject))?;
    unsafe {
        decl.add_method(
            sel!(spaceChanged:),
            space_changed as extern "C" fn(&Object, Sel, id),
        );
        decl.add_method(
            sel!(appActivated:),
            app_activated as extern "C" fn(&Object, Sel, id),
        );
        decl.add_method(
            sel!(screenChanged:),
            screen_changed as extern "C" fn(&Object, Sel, id),
        );
        decl.add_method(
            sel!(itemEnded:),
            item_ended as extern "C" fn(&Object, Sel, id),
        );
    }
    Some(decl.register())
}

fn observer() -> Option<id> {
    OBSERVER
        .get_or_try_init(|| {
            let class = observer_class().ok_or(())?;
            let instance: id = unsafe { msg_send![class, new] };
            if instance == nil {
                return Err(());
            }
            Ok(instance as usize)
        })
        .ok()
        .map(|address| *address as id)
}

unsafe fn default_center() -> id {
    msg_send![class!(NSNotificationCenter), defaultCenter]
}

unsafe fn workspace_center() -> id {
    let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
    msg_send![workspace, notificationCenter]
}

/// Registered desktop observers; unregistered on drop.
pub struct DesktopObservers {
    observer: id,
}

/// Routes space, activation and display notifications into `events`.
pub fn install(events: EventSender) -> Option<DesktopObservers> {
    if EVENTS.set(events).is_err() {
        warn!("desktop observers already installed");
        return None;
    }
    let Some(observer) = observer() else {
        warn!("cannot register the {OBSERVER_CLASS} class");
        return None;
    };
    unsafe {
        let workspace = workspace_center();
        let _: () = msg_send![workspace, addObserver: observer
            selector: sel!(spaceChanged:)
            name: ns_string(ACTIVE_SPACE_CHANGED)
            object: nil];
        let _: () = msg_send![workspace, addObserver: observer
            selector: sel!(appActivated:)
            name: ns_string(APP_ACTIVATED)
            object: nil];
        let _: () = msg_send![default_center(), addObserver: observer
            selector: sel!(screenChanged:)
            name: ns_string(SCREEN_PARAMETERS_CHANGED)
            object: nil];
    }
    info!("desktop observers registered");
    Some(DesktopObservers { observer })
}

impl Drop for DesktopObservers {
    fn drop(&mut self) {
        unsafe {
            let _: () = msg_send![workspace_center(), removeObserver: self.observer];
            let _: () = msg_send![default_center(), removeObserver: self.observer];
        }
    }
}

/// Reports the end of `item` as [`DesktopEvent::ItemEnded`].
pub fn watch_item_end(item: id) -> bool {
    let Some(observer) = observer() else {
        return false;
    };
    unsafe {
        let _: () = msg_send![default_center(), addObserver: observer
            selector: sel!(itemEnded:)
            name: ns_string(ITEM_PLAYED_TO_END)
            object: item];
    }
    true
}

pub fn forget_item_end(item: id) {
    let Some(observer) = OBSERVER.get().map(|address| *address as id) else {
        return;
    };
    unsafe {
        let _: () = msg_send![default_center(), removeObserver: observer
            name: ns_string(ITEM_PLAYED_TO_END)
            object: item];
    }
}
