//! Server binary for pdf2image-server.
//!
//! A thin shim over the library crate that maps flags and environment
//! variables to `ServiceConfig`, installs logging and serves the router.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2image_server::{
    router, AppState, Converter, EngineKind, ImageFormat, ImageMode, ServiceConfig, StorageType,
};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AFTER_HELP: &str = r#"EXAMPLES:
  # Defaults: 0.0.0.0:8000, pages persisted under /tmp/pdf2image_output
  pdf2image-server

  # Inline base64 only, nothing written to disk
  OUTPUT_STORAGE_TYPE=base64 pdf2image-server --port 9000

  # Public URLs behind a reverse proxy
  pdf2image-server --output-dir /srv/pages --output-base-url https://cdn.example.com/pages

  # Convert an upload
  curl -F file=@doc.pdf 'http://localhost:8000/convert?dpi=150&fmt=jpeg&storage_type=both'

ENGINE:
  The default engine runs poppler's pdfinfo, pdftoppm and pdftocairo.
  Install poppler-utils, or point POPPLER_PATH at the directory holding them.
  Builds with `--features pdfium` also accept PDF_ENGINE=pdfium.

LOGGING:
  Logs go to stderr. Set LOG_FILE to also append them (without colours) to a file.

All options can be set in a .env file in the working directory.
"#;

/// Serve PDF-to-image conversion over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2image-server",
    version,
    about = "Serve PDF-to-image conversion over HTTP",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Bind address.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Bind port.
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Debug mode (DEBUG-level logs).
    #[arg(long, env = "DEBUG")]
    debug: bool,

    /// Default storage type: base64, file, both.
    #[arg(long, env = "OUTPUT_STORAGE_TYPE", default_value = "file")]
    storage_type: StorageType,

    /// Default image mode: base64, path.
    #[arg(long, env = "DEFAULT_IMAGE_MODE", default_value = "base64")]
    image_mode: ImageMode,

    /// Directory receiving persisted pages.
    #[arg(long, env = "OUTPUT_DIR", default_value = "/tmp/pdf2image_output")]
    output_dir: PathBuf,

    /// Public URL prefix under which the output directory is served.
    #[arg(long, env = "OUTPUT_BASE_URL", default_value = "http://localhost:8000/files")]
    output_base_url: String,

    /// Maximum PDF size in bytes.
    #[arg(long, env = "MAX_FILE_SIZE", default_value_t = 50 * 1024 * 1024)]
    max_file_size: usize,

    /// Default rendering DPI (50–600).
    #[arg(long, env = "DEFAULT_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(50..=600))]
    dpi: u32,

    /// Default output format: jpeg, png, ppm, tiff.
    #[arg(long, env = "DEFAULT_FORMAT", default_value = "png")]
    format: ImageFormat,

    /// Upper bound on per-request thread_count (1–8).
    #[arg(long, env = "MAX_THREAD_COUNT", default_value_t = 8,
          value_parser = clap::value_parser!(u32).range(1..=8))]
    max_thread_count: u32,

    /// Default engine timeout in seconds (30–1800).
    #[arg(long, env = "DEFAULT_TIMEOUT", default_value_t = 600,
          value_parser = clap::value_parser!(u64).range(30..=1800))]
    timeout: u64,

    /// Allowed CORS origins, comma separated; `*` allows any.
    #[arg(long, env = "CORS_ORIGINS", default_value = "*", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Directory holding the poppler binaries (or the pdfium library).
    #[arg(long, env = "POPPLER_PATH")]
    poppler_path: Option<PathBuf>,

    /// Rasterisation engine: poppler, pdfium.
    #[arg(long, env = "PDF_ENGINE", default_value = "poppler")]
    engine: EngineKind,

    /// Result caching flag (accepted, not implemented).
    #[arg(long, env = "ENABLE_CACHE")]
    enable_cache: bool,

    /// Cache TTL in seconds (accepted, not implemented).
    #[arg(long, env = "CACHE_TTL", default_value_t = 3600)]
    cache_ttl: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMAGE_VERBOSE")]
    verbose: bool,

    /// Also append logs to this file.
    #[arg(long, env = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<ServiceConfig> {
        let config = ServiceConfig::builder()
            .host(self.host)
            .port(self.port)
            .debug(self.debug)
            .default_storage_type(self.storage_type)
            .default_image_mode(self.image_mode)
            .output_dir(self.output_dir)
            .output_base_url(self.output_base_url)
            .max_file_size(self.max_file_size)
            .default_dpi(self.dpi)
            .default_format(self.format)
            .max_thread_count(self.max_thread_count)
            .default_timeout_secs(self.timeout)
            .cors_origins(self.cors_origins)
            .poppler_path(self.poppler_path)
            .engine(self.engine)
            .enable_cache(self.enable_cache)
            .cache_ttl_secs(self.cache_ttl)
            .build()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads the environment.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let verbose = cli.verbose;
    let log_file = cli.log_file.clone();

    // ── Configuration ────────────────────────────────────────────────────
    let config = Arc::new(cli.into_config().context("Invalid configuration")?);

    // ── Logging setup ────────────────────────────────────────────────────
    init_logging(verbose || config.debug, log_file.as_deref())?;
    info!(
        "Storage: {} (mode {}), output dir {}, upload limit {} MB",
        config.default_storage_type,
        config.default_image_mode,
        config.output_dir.display(),
        config.max_file_size_mb()
    );
    if let Some(path) = &log_file {
        info!("Appending logs to {}", path.display());
    }
    if config.enable_cache {
        warn!(
            "ENABLE_CACHE is set but result caching is not implemented (CACHE_TTL={}s ignored)",
            config.cache_ttl_secs
        );
    }

    // ── Engine ───────────────────────────────────────────────────────────
    let converter = Converter::from_config(config.clone()).context("Failed to set up engine")?;
    match converter.engine().probe().await {
        Ok(version) => info!("Engine {}: {}", converter.engine().name(), version),
        Err(e) => warn!(
            "Engine {} is not usable ({}); conversions will fail until it is installed",
            converter.engine().name(),
            e
        ),
    }

    if config.serves_files() {
        tokio::fs::create_dir_all(&config.output_dir)
            .await
            .with_context(|| {
                format!("Failed to create output dir {}", config.output_dir.display())
            })?;
    }

    // ── Serve ────────────────────────────────────────────────────────────
    let app = router(AppState::new(converter));
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(
        "pdf2image-server v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// stderr always; `log_file` additionally, without ANSI colours.
/// `RUST_LOG` overrides the level.
fn init_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
