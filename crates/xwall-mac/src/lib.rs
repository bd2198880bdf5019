//! macOS implementations of the platform traits and the application loop.

use xwall_platform::Result;

cfg_if::cfg_if! {
    if #[cfg(target_os = "macos")] {
        mod app;
        mod desktop;
        mod ffi;
        mod media;
        mod observers;
        mod shell;
        mod surface;
        mod tray;

        /// Runs the menu-bar app until the user quits.
        pub fn run_app() -> Result<()> {
            app::run()
        }
    } else {
        pub fn run_app() -> Result<()> {
            tracing::error!("unsupported platform");
            Err("xwall only runs on macOS".into())
        }
    }
}
