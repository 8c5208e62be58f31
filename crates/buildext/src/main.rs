use buildext::commands::build_ext::BuildExtPlugin;
use buildext::registry::Application;
use buildext::GlobalOpts;
use buildext_logger as logger;
use clap::FromArgMatches;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let app = Application::with_plugins(&[&BuildExtPlugin]);
    let matches = app.cli().get_matches();
    let global = GlobalOpts::from_arg_matches(&matches).unwrap_or_default();

    init_tracing(global.verbosity_level());
    if let Err(e) = logger::init_with_verbosity(global.verbosity_level()) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }

    if let Err(e) = app.dispatch(&matches, &global) {
        logger::error(&e.to_string());
        logger::show_log_path();
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
