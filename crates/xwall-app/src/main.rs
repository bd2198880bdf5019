use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use xwall_mac::run_app;

fn main() {
    // RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    info!("xwall starting");
    if let Err(e) = run_app() {
        eprintln!("xwall error: {e}");
        std::process::exit(1);
    }
}
