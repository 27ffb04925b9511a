use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use rand::{SeedableRng, rngs::StdRng};
use tracing::error;
use tracing_subscriber::EnvFilter;

use plinth::{
    BackendKind, ExifReader, Kiosk, KioskConfig, PdfFormRenderer, RemoteCatalog, RemoteConfig,
    RetryPolicy, Surface, SurfaceConfig, create_backend,
};

#[derive(Parser, Debug)]
#[command(name = "plinth", version, about = "Dual-output photo kiosk")]
struct Cli {
    /// Subjects kept in the no-repeat history (0 disables).
    #[arg(long, default_value_t = 3)]
    subject_history: usize,

    /// Photos kept in the no-repeat history (0 disables).
    #[arg(long, default_value_t = 10)]
    photo_history: usize,

    /// Milliseconds between swaps.
    #[arg(long, default_value_t = 10_000)]
    swap_interval_ms: u64,

    /// Milliseconds between scheduler ticks.
    #[arg(long, default_value_t = 500)]
    tick_ms: u64,

    /// Output index showing the photo.
    #[arg(long, default_value_t = 1)]
    photo_output: usize,

    /// Output index showing the plaque.
    #[arg(long, default_value_t = 0)]
    plaque_output: usize,

    /// Display backend.
    #[arg(long, value_enum, default_value_t = DisplayChoice::Fbdev)]
    display: DisplayChoice,

    /// Cross-fade between image pairs.
    #[arg(long)]
    fade: bool,

    /// Attempts per catalog operation before giving up.
    #[arg(long, default_value_t = 5)]
    max_retries: u32,

    /// Catalog folder holding the subject records.
    #[arg(long, default_value = "/subjects")]
    catalog_folder: String,

    /// pdftk-compatible form filler binary.
    #[arg(long, default_value = "pdftk")]
    form_filler: PathBuf,

    /// pdftoppm-compatible rasterizer binary.
    #[arg(long, default_value = "pdftoppm")]
    rasterizer: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DisplayChoice {
    Fbdev,
    Headless,
}

impl From<DisplayChoice> for BackendKind {
    fn from(choice: DisplayChoice) -> Self {
        match choice {
            DisplayChoice::Fbdev => BackendKind::Fbdev,
            DisplayChoice::Headless => BackendKind::Headless,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PLINTH_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let remote_config = RemoteConfig::from_env(cli.catalog_folder.clone())?;
    let retry = RetryPolicy::new(cli.max_retries, RetryPolicy::DEFAULT_DELAY)?;
    let catalog = RemoteCatalog::new(remote_config, retry)?;
    let renderer = PdfFormRenderer::new(cli.form_filler.clone(), cli.rasterizer.clone())?;

    let mut backend = create_backend(cli.display.into())?;
    let surface = Surface::create(
        backend.as_mut(),
        &SurfaceConfig {
            photo_output: cli.photo_output,
            plaque_output: cli.plaque_output,
            fade: cli.fade,
        },
    )?;

    let mut kiosk = Kiosk::new(
        Box::new(catalog),
        Box::new(renderer),
        Box::new(ExifReader),
        surface,
        KioskConfig {
            subject_history: cli.subject_history,
            photo_history: cli.photo_history,
            swap_interval: Duration::from_millis(cli.swap_interval_ms),
            tick_interval: Duration::from_millis(cli.tick_ms),
        },
        StdRng::from_os_rng(),
    )?;

    // Fatal or not, the frequency summary is flushed exactly once.
    let outcome = kiosk.run();
    kiosk.shutdown();
    if let Err(err) = &outcome {
        error!(error = %err, "kiosk stopped on a fatal error");
    }
    outcome?;
    Ok(())
}
