//! Poppler backend: drive `pdfinfo`, `pdftoppm` and `pdftocairo` as
//! subprocesses.
//!
//! Each call gets a private [`TempDir`] holding the input PDF and the
//! rendered page files; it is removed when the call returns, on every path.
//!
//! A render call first runs `pdfinfo` to learn the page count, splits the
//! requested range into `thread_count` contiguous chunks and runs one
//! rasteriser process per chunk. One deadline, taken when the call starts,
//! covers `pdfinfo` and every rasteriser; when it expires the running
//! processes are killed (`kill_on_drop`) and [`EngineError::Timeout`] is
//! returned.

use super::{RasterEngine, RawMetadata, RenderRequest};
use crate::config::ImageFormat;
use crate::error::EngineError;
use async_trait::async_trait;
use futures::future::try_join_all;
use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::OsString;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info};

const PDFINFO: &str = "pdfinfo";
const PDFTOPPM: &str = "pdftoppm";
const PDFTOCAIRO: &str = "pdftocairo";

/// Name of the input copy inside the working directory.
const INPUT_NAME: &str = "input.pdf";

/// Marker poppler prints for structural problems it would otherwise recover from.
const SYNTAX_ERROR_MARKER: &str = "Syntax Error";

/// Rasterise via the poppler command-line tools.
#[derive(Debug, Clone, Default)]
pub struct PopplerEngine {
    /// Directory containing the binaries; `None` resolves them through `PATH`.
    bin_dir: Option<PathBuf>,
}

impl PopplerEngine {
    pub fn new(bin_dir: Option<PathBuf>) -> Self {
        Self { bin_dir }
    }

    fn tool_path(&self, tool: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(tool),
            None => PathBuf::from(tool),
        }
    }

    /// Spawn `tool` and collect its output. The child is killed if the
    /// returned future is dropped.
    async fn run(&self, tool: &'static str, args: Vec<OsString>) -> Result<Output, EngineError> {
        debug!("Running {} {:?}", tool, args);
        Command::new(self.tool_path(tool))
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => EngineError::NotInstalled {
                    tool: tool.to_string(),
                    detail: e.to_string(),
                },
                _ => EngineError::Other(format!("failed to run {tool}: {e}")),
            })
    }

    /// Run a rasteriser and turn its exit status and stderr into an error.
    async fn run_rasteriser(
        &self,
        tool: &'static str,
        args: Vec<OsString>,
        strict: bool,
    ) -> Result<(), EngineError> {
        let output = self.run(tool, args).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if strict {
            if let Some(detail) = syntax_error(&stderr) {
                return Err(EngineError::Syntax(detail));
            }
        }
        if !output.status.success() {
            return Err(EngineError::Other(format!(
                "{tool} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn pdfinfo(&self, pdf_path: &Path, strict: bool) -> Result<RawMetadata, EngineError> {
        let args = vec![OsString::from("-isodates"), pdf_path.as_os_str().to_owned()];
        let output = self.run(PDFINFO, args).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if strict {
            if let Some(detail) = syntax_error(&stderr) {
                return Err(EngineError::Syntax(detail));
            }
        }
        if !output.status.success() {
            return Err(EngineError::PageCount(stderr.trim().to_string()));
        }

        Ok(parse_pdfinfo(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[async_trait]
impl RasterEngine for PopplerEngine {
    fn name(&self) -> &'static str {
        "poppler"
    }

    async fn render(
        &self,
        pdf: &[u8],
        request: &RenderRequest,
    ) -> Result<Vec<DynamicImage>, EngineError> {
        let secs = request.timeout_secs;
        let deadline = Instant::now() + Duration::from_secs(secs);
        let workdir = create_workdir()?;
        let pdf_path = write_input(&workdir, pdf).await?;

        let info = within(deadline, secs, self.pdfinfo(&pdf_path, request.strict)).await?;
        let total = info
            .get("Pages")
            .and_then(|p| p.trim().parse::<u32>().ok())
            .ok_or_else(|| EngineError::PageCount("pdfinfo reported no page count".into()))?;

        let first = request.first_page.unwrap_or(1).max(1);
        let last = request.last_page.unwrap_or(total).min(total);
        if first > last {
            debug!(
                "Empty page range {}–{} (document has {} pages)",
                first, last, total
            );
            return Ok(Vec::new());
        }

        let tool = select_tool(request);
        let chunks = split_page_range(first, last, request.thread_count);
        info!(
            "Rendering pages {}–{} of {} with {} in {} process(es)",
            first,
            last,
            total,
            tool,
            chunks.len()
        );

        let runs = chunks.iter().enumerate().map(|(i, &(from, to))| {
            let prefix = workdir.path().join(format!("p{i:02}"));
            let args = render_args(tool, request, from, to, &pdf_path, &prefix);
            self.run_rasteriser(tool, args, request.strict)
        });

        within(deadline, secs, try_join_all(runs)).await?;

        let dir = workdir.path().to_path_buf();
        let images = tokio::task::spawn_blocking(move || load_rendered(&dir))
            .await
            .map_err(|e| EngineError::Other(format!("decode task panicked: {e}")))??;

        debug!("Decoded {} page image(s)", images.len());
        Ok(images)
    }

    async fn inspect(&self, pdf: &[u8], strict: bool) -> Result<RawMetadata, EngineError> {
        let workdir = create_workdir()?;
        let pdf_path = write_input(&workdir, pdf).await?;
        self.pdfinfo(&pdf_path, strict).await
    }

    async fn probe(&self) -> Result<String, EngineError> {
        // `-v` prints the version banner on stderr.
        let output = self.run(PDFTOPPM, vec![OsString::from("-v")]).await?;
        let banner = [&output.stderr[..], &output.stdout[..]]
            .iter()
            .map(|s| String::from_utf8_lossy(s).to_string())
            .flat_map(|s| s.lines().map(str::to_string).collect::<Vec<_>>())
            .find(|l| !l.trim().is_empty())
            .unwrap_or_else(|| "pdftoppm (unknown version)".to_string());
        Ok(banner.trim().to_string())
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run `fut` until `deadline`; expiry drops it (killing its children) and
/// reports a `secs`-second timeout.
async fn within<T>(
    deadline: Instant,
    secs: u64,
    fut: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| EngineError::Timeout { secs })?
}

fn create_workdir() -> Result<TempDir, EngineError> {
    TempDir::new().map_err(|e| EngineError::Other(format!("failed to create temp dir: {e}")))
}

async fn write_input(workdir: &TempDir, pdf: &[u8]) -> Result<PathBuf, EngineError> {
    let path = workdir.path().join(INPUT_NAME);
    tokio::fs::write(&path, pdf)
        .await
        .map_err(|e| EngineError::Other(format!("failed to write temp PDF: {e}")))?;
    Ok(path)
}

/// First stderr line mentioning a syntax error, if any.
fn syntax_error(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .find(|l| l.contains(SYNTAX_ERROR_MARKER))
        .map(|l| l.trim().to_string())
}

static RE_INFO_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([^:\r\n]+):[ \t]*(.*?)\s*$").unwrap());

/// Parse `Key:   value` lines printed by `pdfinfo`.
fn parse_pdfinfo(stdout: &str) -> RawMetadata {
    RE_INFO_LINE
        .captures_iter(stdout)
        .map(|c| (c[1].trim().to_string(), c[2].to_string()))
        .collect()
}

/// `pdftocairo` is used on request, and whenever a transparent PNG is asked
/// for since `-transp` only exists there.
fn select_tool(request: &RenderRequest) -> &'static str {
    let transparent_png = request.transparent && request.format.delivered() == ImageFormat::Png;
    if request.use_alt_engine || transparent_png {
        PDFTOCAIRO
    } else {
        PDFTOPPM
    }
}

/// Split `[first, last]` into at most `threads` contiguous, near-equal chunks.
fn split_page_range(first: u32, last: u32, threads: u32) -> Vec<(u32, u32)> {
    let count = last - first + 1;
    let threads = threads.clamp(1, count);
    let base = count / threads;
    let remainder = count % threads;

    let mut start = first;
    (0..threads)
        .map(|i| {
            let len = base + u32::from(i < remainder);
            let chunk = (start, start + len - 1);
            start += len;
            chunk
        })
        .collect()
}

fn render_args(
    tool: &str,
    request: &RenderRequest,
    first: u32,
    last: u32,
    input: &Path,
    out_prefix: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |a: &str| args.push(OsString::from(a));

    push("-r");
    push(&request.dpi.to_string());
    push("-f");
    push(&first.to_string());
    push("-l");
    push(&last.to_string());

    match request.format {
        ImageFormat::Jpeg => push("-jpeg"),
        ImageFormat::Png => push("-png"),
        ImageFormat::Tiff => push("-tiff"),
        // pdftoppm writes ppm by default; pdftocairo has no ppm output.
        ImageFormat::Ppm if tool == PDFTOCAIRO => push("-png"),
        ImageFormat::Ppm => {}
    }

    if request.grayscale {
        push("-gray");
    }
    if let Some(size) = request.target_size {
        push("-scale-to");
        push(&size.to_string());
    }
    if request.format == ImageFormat::Jpeg {
        if let Some(opt) = request.jpeg_options.and_then(|j| j.to_poppler_arg()) {
            push("-jpegopt");
            push(&opt);
        }
    }
    if tool == PDFTOCAIRO && request.transparent && request.format.delivered() == ImageFormat::Png {
        push("-transp");
    }

    args.push(input.as_os_str().to_owned());
    args.push(out_prefix.as_os_str().to_owned());
    args
}

/// Page number poppler encodes in an output name like `p00-007.png`.
fn rendered_page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let (_, number) = stem.rsplit_once('-')?;
    number.parse().ok()
}

/// Decode every rendered page in `dir`, sorted by page number.
fn load_rendered(dir: &Path) -> Result<Vec<DynamicImage>, EngineError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| EngineError::Other(format!("failed to list rendered pages: {e}")))?;

    let mut pages: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.file_name().and_then(|n| n.to_str()) != Some(INPUT_NAME))
        .filter_map(|path| rendered_page_number(&path).map(|n| (n, path)))
        .collect();
    pages.sort_by_key(|(n, _)| *n);

    pages
        .into_iter()
        .map(|(n, path)| {
            image::open(&path)
                .map_err(|e| EngineError::Other(format!("failed to decode page {n}: {e}")))
        })
        .collect()
}
