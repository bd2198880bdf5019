//! The menu-bar application loop.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use cocoa::base::{id, nil, YES};
use crossbeam_channel::Receiver;
use objc::{class, msg_send, sel, sel_impl};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};
use tray_icon::menu::MenuId;
use winit::application::ApplicationHandler;
use winit::event::{StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::platform::macos::{ActivationPolicy, EventLoopBuilderExtMacOS};
use winit::window::WindowId;
use xwall_core::autostart;
use xwall_core::{
    AppIdentity, Collaborators, DesktopEvent, Dispatcher, SettingsStore, WallpaperController,
    Waker,
};
use xwall_platform::Result;
use xwall_ui::{MenuOutcome, MenuState};

use crate::desktop::{request_accessibility, MacDesktop};
use crate::ffi::{box_err, to_string};
use crate::media::MacMedia;
use crate::observers::{self, DesktopObservers};
use crate::shell::MacShell;
use crate::surface::MacSurfaceFactory;
use crate::tray::{self, Tray};

const DEFAULT_LABEL: &str = "dev.xwall.app";
const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "mov", "m4v"];

#[derive(Debug, Clone, Copy)]
enum AppEvent {
    Wake,
}

static PROXY: OnceCell<Mutex<EventLoopProxy<AppEvent>>> = OnceCell::new();

fn wake() {
    if let Some(proxy) = PROXY.get() {
        if let Ok(proxy) = proxy.lock() {
            let _ = proxy.send_event(AppEvent::Wake);
        }
    }
}

fn identity() -> AppIdentity {
    let bundle_id = unsafe {
        let bundle: id = msg_send![class!(NSBundle), mainBundle];
        if bundle == nil {
            None
        } else {
            let ident: id = msg_send![bundle, bundleIdentifier];
            to_string(ident)
        }
    };
    let executable = std::env::current_exe().unwrap_or_else(|err| {
        warn!("cannot resolve the executable path: {err}");
        PathBuf::from("xwall")
    });
    AppIdentity {
        label: bundle_id
            .clone()
            .unwrap_or_else(|| DEFAULT_LABEL.to_string()),
        bundle_id,
        executable,
        pid: std::process::id() as i32,
        uid: unsafe { libc::getuid() },
        sandboxed: autostart::is_sandboxed(),
        agents_dir: autostart::default_agents_dir(),
    }
}

fn pick_video() -> Option<PathBuf> {
    unsafe {
        let app: id = msg_send![class!(NSApplication), sharedApplication];
        let _: () = msg_send![app, activateIgnoringOtherApps: YES];
    }
    rfd::FileDialog::new()
        .set_title("Import Video")
        .add_filter("Video", &VIDEO_EXTENSIONS)
        .pick_file()
}

struct App {
    controller: WallpaperController,
    dispatcher: Dispatcher<WallpaperController>,
    menu_rx: Receiver<MenuId>,
    tray: Option<Tray>,
    observers: Option<DesktopObservers>,
}

impl App {
    fn start(&mut self) {
        if self.controller.settings().auto_pause_on_fullscreen {
            request_accessibility();
        }
        WallpaperController::subscribe_defaults(&mut self.dispatcher);
        self.observers = observers::install(self.dispatcher.sender());
        self.controller.startup(Instant::now());

        match Tray::new(&MenuState::capture(&self.controller)) {
            Ok(tray) => self.tray = Some(tray),
            Err(err) => warn!("cannot create the status item: {err}"),
        }
        info!("xwall ready; settings at {}", self.controller.settings_path().display());
    }

    fn drain(&mut self, event_loop: &ActiveEventLoop) {
        let delivered = self.dispatcher.pump(&mut self.controller);
        if delivered > 0 {
            debug!("delivered {delivered} desktop event(s)");
        }

        while let Ok(id) = self.menu_rx.try_recv() {
            let Some(action) = self.tray.as_ref().and_then(|tray| tray.action(&id)) else {
                debug!("stale menu id {id:?}");
                continue;
            };
            match xwall_ui::dispatch(action, &mut self.controller) {
                MenuOutcome::Handled => {}
                MenuOutcome::PickFile => {
                    let picked = pick_video();
                    self.controller.import(picked.as_deref());
                }
                MenuOutcome::Quit => {
                    event_loop.exit();
                    return;
                }
            }
        }
    }

    fn refresh_tray(&mut self) {
        if let Some(tray) = self.tray.as_mut() {
            tray.refresh(&MenuState::capture(&self.controller));
        }
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn new_events(&mut self, _event_loop: &ActiveEventLoop, cause: StartCause) {
        if matches!(cause, StartCause::Init) {
            self.start();
        }
    }

    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn user_event(&mut self, event_loop: &ActiveEventLoop, _event: AppEvent) {
        self.drain(event_loop);
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, _event: WindowEvent) {}

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.drain(event_loop);
        if event_loop.exiting() {
            return;
        }
        if self.controller.tick_due(Instant::now()) {
            self.dispatcher
                .dispatch(&mut self.controller, DesktopEvent::Tick);
        }
        self.refresh_tray();

        match self.controller.next_deadline() {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        info!("xwall exiting");
        self.controller.shutdown();
        self.observers = None;
        self.tray = None;
    }
}

pub fn run() -> Result<()> {
    let event_loop = EventLoop::<AppEvent>::with_user_event()
        .with_activation_policy(ActivationPolicy::Accessory)
        .build()
        .map_err(box_err)?;
    if PROXY.set(Mutex::new(event_loop.create_proxy())).is_err() {
        return Err("the application loop is already running".into());
    }
    let waker: Waker = Arc::new(wake);

    let store = SettingsStore::open(SettingsStore::default_path()?);
    let collab = Collaborators {
        desktop: Box::new(MacDesktop::default()),
        surfaces: Box::new(MacSurfaceFactory),
        media: Box::new(MacMedia),
        shell: Box::new(MacShell),
    };
    let controller = WallpaperController::new(store, identity(), collab);

    let (menu_tx, menu_rx) = crossbeam_channel::unbounded();
    tray::forward_menu_events(menu_tx, waker.clone());

    let mut app = App {
        controller,
        dispatcher: Dispatcher::new(Some(waker)),
        menu_rx,
        tray: None,
        observers: None,
    };
    event_loop.run_app(&mut app).map_err(box_err)?;
    Ok(())
}
