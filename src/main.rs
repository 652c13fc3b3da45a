use clap::Parser;
use eframe::{egui, NativeOptions};
use metadata_reader::app::{App, WINDOW_TITLE};
use metadata_reader::cli::{self, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Cli::parse();

    if let Some(Commands::Scan {
        folder,
        json,
        max_value_chars,
    }) = args.command
    {
        return cli::scan(&folder, json, max_value_chars);
    }

    let native_options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size([1000., 800.])
            .with_position([100., 100.]),
        ..NativeOptions::default()
    };

    let folder = args.folder;
    eframe::run_native(
        WINDOW_TITLE,
        native_options,
        Box::new(|cc| Ok(Box::new(App::new(cc, folder)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
