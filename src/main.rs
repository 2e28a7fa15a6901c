use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use zeroui::core::config::{self, CliOverrides, ListLayout, Settings};
use zeroui::core::error::InitError;
use zeroui::data::{DataProvider, FileProvider, MemoryProvider};

#[derive(Parser)]
#[command(name = "zeroui", about = "Edit desktop app settings from the terminal")]
struct Args {
    /// Open this app's settings form on startup
    #[arg(short, long)]
    app: Option<String>,

    /// Directory holding app definitions
    #[arg(long)]
    apps_dir: Option<PathBuf>,

    /// How the app list is laid out
    #[arg(short, long, value_enum)]
    layout: Option<ListLayout>,

    /// Use built-in sample apps instead of the apps directory
    #[arg(long)]
    demo: bool,

    /// Where to write the log
    #[arg(long, default_value = "zeroui.log")]
    log_file: PathBuf,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Logs go to a file; the terminal belongs to the UI.
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let level = if args.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Debug
    };
    if let Ok(log_file) = File::create(&args.log_file) {
        let _ = WriteLogger::init(level, log_config, log_file);
    }

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("Panic: {info}");
        default_hook(info);
    }));

    log::info!("ZeroUI {} starting up", env!("CARGO_PKG_VERSION"));

    match start(args).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            log::error!("Startup failed: {e}");
            eprintln!("zeroui: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn start(args: Args) -> Result<i32, InitError> {
    let file_config = config::load_config()?;
    let overrides = CliOverrides {
        apps_dir: args.apps_dir,
        list_layout: args.layout,
    };
    let settings: Settings = config::resolve(&file_config, &overrides);
    log::debug!("Resolved settings: {settings:?}");

    let provider: Arc<dyn DataProvider> = if args.demo {
        Arc::new(MemoryProvider::sample())
    } else {
        Arc::new(FileProvider::open(settings.apps_dir.clone())?)
    };
    log::info!("Using {} provider", provider.name());

    zeroui::tui::run(settings, provider, args.app).await
}
