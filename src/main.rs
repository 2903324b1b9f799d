mod app;
mod family;
mod geometry;
mod hierarchy;
mod util;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Family file to open and save into. The bundled sample family is shown
    /// when omitted.
    #[arg(long)]
    family: Option<PathBuf>,

    /// Tracing filter directive; `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    log_filter: String,
}

fn init_logging(directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_filter);

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "family-graph",
        options,
        Box::new(move |cc| Ok(Box::new(app::FamilyGraphApp::new(cc, args.family.clone())))),
    )
}
