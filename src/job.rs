//! Conversion orchestration and job supersession.
//!
//! Every trigger (new source, palette change, block size change, grid
//! resolution change, format change) allocates the next job id and makes it
//! current. Work for an older id may still be running — it runs to
//! completion, but its result is compared against the current id at the
//! commit point and dropped if stale. "Last trigger wins" is the only
//! ordering contract; at most one in-flight conversion's result is ever
//! committed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::{debug, warn};

use crate::animation::{encode_animation, AnimationFrame};
use crate::budget::safe_block_size;
use crate::decoder::{decode_animation, AnimatedSource};
use crate::error::{PixelGridError, Result};
use crate::palette::{Palette, PaletteLookup};
use crate::quantizer::{quantize, quantize_in_place, ColorGrid};
use crate::raster::{encode_png, expand_blocks};
use crate::vector::render_svg;

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Svg,
    Gif,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertSettings {
    /// Palette catalog id; unknown ids fall back to the default palette
    pub palette_id: String,
    /// Sample grid width in cells
    pub grid_width: u32,
    /// Sample grid height in cells
    pub grid_height: u32,
    /// Requested output pixels per cell (may be reduced by the budget solver)
    pub block_size: u32,
    pub format: OutputFormat,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            palette_id: "pico8".to_string(),
            grid_width: 64,
            grid_height: 64,
            block_size: 8,
            format: OutputFormat::Png,
        }
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// A committed conversion output
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Png(Vec<u8>),
    Svg(String),
    Gif(Vec<u8>),
}

impl Artifact {
    pub fn extension(&self) -> &'static str {
        match self {
            Artifact::Png(_) => "png",
            Artifact::Svg(_) => "svg",
            Artifact::Gif(_) => "gif",
        }
    }
}

/// Non-fatal note: the budget solver reduced the requested block size.
/// The job still commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetNote {
    pub requested: u32,
    pub actual: u32,
}

#[derive(Debug, Clone)]
pub enum ConvertOutcome {
    Committed {
        artifact: Artifact,
        notes: Vec<BudgetNote>,
    },
    /// A newer trigger took over; this job's artifact was dropped unseen
    Superseded,
    /// Animated parse still in flight — no work was performed
    Parsing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    Parsing,
    Processing,
    Done,
    Failed(String),
}

// ============================================================================
// JOB IDENTITY
// ============================================================================

/// Monotone identity of one conversion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobId(u64);

/// The single shared "current job id" cell.
///
/// Read-modify-write happens only at trigger time; every asynchronous
/// resumption point is a read-only comparison. Atomic because the blocking
/// work runs on a multi-threaded runtime.
#[derive(Debug, Default)]
pub struct JobTracker {
    current: AtomicU64,
}

impl JobTracker {
    /// Allocate the next job id and make it current, superseding any
    /// in-flight job
    pub fn begin(&self) -> JobId {
        JobId(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, id: JobId) -> bool {
        self.current.load(Ordering::SeqCst) == id.0
    }
}

// ============================================================================
// SESSION STATE
// ============================================================================

#[derive(Debug, Clone)]
enum SourceState {
    Empty,
    Still(Arc<RgbaImage>),
    /// Animated parse offloaded and not yet delivered
    Parsing,
    Animated(Arc<AnimatedSource>),
    ParseFailed(String),
}

#[derive(Debug)]
struct Session {
    source: SourceState,
    artifact: Option<Artifact>,
    status: JobStatus,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            source: SourceState::Empty,
            artifact: None,
            status: JobStatus::Idle,
        }
    }
}

// ============================================================================
// CONVERTER
// ============================================================================

/// Owns job identity and session state; sequences decode → quantize → encode
/// and commits results only while still current.
#[derive(Debug, Default)]
pub struct Converter {
    jobs: JobTracker,
    session: Mutex<Session>,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a new source from raw uploaded bytes.
    ///
    /// Non-image bytes fail immediately with `UnsupportedSource` — no job is
    /// created and no session state changes. GIF bytes go through the
    /// offloaded animated parse; anything else decodes synchronously as a
    /// still image. Loading a source supersedes any in-flight job; a parse
    /// that is itself superseded before delivering is discarded in turn.
    pub async fn load_source(&self, bytes: Vec<u8>) -> Result<()> {
        let is_gif = bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a");
        if !is_gif && image::guess_format(&bytes).is_err() {
            return Err(PixelGridError::UnsupportedSource);
        }

        let job = self.jobs.begin();
        self.load_source_job(job, bytes).await
    }

    pub(crate) async fn load_source_job(&self, job: JobId, bytes: Vec<u8>) -> Result<()> {
        let is_gif = bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a");
        debug!(job = job.0, gif = is_gif, len = bytes.len(), "loading source");

        if is_gif {
            {
                let mut session = self.session.lock().unwrap();
                if !self.jobs.is_current(job) {
                    return Ok(());
                }
                session.source = SourceState::Parsing;
                session.status = JobStatus::Parsing;
            }

            let parsed = task::spawn_blocking(move || decode_animation(&bytes))
                .await
                .map_err(|e| PixelGridError::Decode(format!("Task join error: {}", e)))?;

            let mut session = self.session.lock().unwrap();
            if !self.jobs.is_current(job) {
                // A newer trigger owns the session; this parse (or its
                // failure) is dropped unseen
                warn!(job = job.0, "discarding superseded source parse");
                return Ok(());
            }
            match parsed {
                Ok(source) => {
                    session.source = SourceState::Animated(Arc::new(source));
                    session.status = JobStatus::Idle;
                    Ok(())
                }
                Err(e) => {
                    // Partial source is discarded; still formats remain usable
                    session.source = SourceState::ParseFailed(e.to_string());
                    session.status = JobStatus::Failed(e.to_string());
                    Err(e)
                }
            }
        } else {
            let decoded = image::load_from_memory(&bytes);
            let mut session = self.session.lock().unwrap();
            if !self.jobs.is_current(job) {
                warn!(job = job.0, "discarding superseded source load");
                return Ok(());
            }
            match decoded {
                Ok(img) => {
                    session.source = SourceState::Still(Arc::new(img.to_rgba8()));
                    session.status = JobStatus::Idle;
                    Ok(())
                }
                Err(e) => {
                    session.status = JobStatus::Failed(e.to_string());
                    Err(PixelGridError::Load(e))
                }
            }
        }
    }

    /// Run one conversion attempt against the loaded source. Allocates the
    /// next job id; the result commits only if that id is still current when
    /// the work completes.
    pub async fn convert(&self, settings: ConvertSettings) -> Result<ConvertOutcome> {
        let job = self.jobs.begin();
        self.convert_job(job, settings).await
    }

    pub(crate) async fn convert_job(
        &self,
        job: JobId,
        settings: ConvertSettings,
    ) -> Result<ConvertOutcome> {
        let source = {
            let mut session = self.session.lock().unwrap();
            if !self.jobs.is_current(job) {
                // Superseded before starting; visible state belongs to the
                // newer job and stays untouched
                return Ok(ConvertOutcome::Superseded);
            }
            match (&settings.format, &session.source) {
                (OutputFormat::Gif, SourceState::Parsing) => {
                    session.status = JobStatus::Parsing;
                    return Ok(ConvertOutcome::Parsing);
                }
                (OutputFormat::Gif, SourceState::ParseFailed(msg)) => {
                    let msg = msg.clone();
                    session.status = JobStatus::Failed(msg.clone());
                    return Err(PixelGridError::Decode(msg));
                }
                (_, SourceState::Empty) => {
                    return Err(PixelGridError::NoSource);
                }
                _ => {
                    session.status = JobStatus::Processing;
                    session.source.clone()
                }
            }
        };

        debug!(job = job.0, format = ?settings.format, "starting conversion");

        let result = task::spawn_blocking(move || run_pipeline(&source, &settings))
            .await
            .map_err(|e| PixelGridError::Encode(format!("Task join error: {}", e)))?;

        let mut session = self.session.lock().unwrap();
        if !self.jobs.is_current(job) {
            // Dropping the artifact here is the release of the stale job's
            // transient output
            warn!(job = job.0, "discarding superseded conversion result");
            return Ok(ConvertOutcome::Superseded);
        }

        match result {
            Ok((artifact, notes)) => {
                session.artifact = Some(artifact.clone());
                session.status = JobStatus::Done;
                Ok(ConvertOutcome::Committed { artifact, notes })
            }
            Err(e) => {
                // Previous committed artifact stays visible; no retry
                session.status = JobStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn begin_job(&self) -> JobId {
        self.jobs.begin()
    }

    pub fn status(&self) -> JobStatus {
        self.session.lock().unwrap().status.clone()
    }

    /// Last committed artifact, if any
    pub fn artifact(&self) -> Option<Artifact> {
        self.session.lock().unwrap().artifact.clone()
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

fn run_pipeline(
    source: &SourceState,
    settings: &ConvertSettings,
) -> Result<(Artifact, Vec<BudgetNote>)> {
    match source {
        SourceState::Still(img) => run_still(img, settings),
        SourceState::Animated(src) => run_animated(src, settings),
        _ => Err(PixelGridError::NoSource),
    }
}

fn run_still(img: &RgbaImage, settings: &ConvertSettings) -> Result<(Artifact, Vec<BudgetNote>)> {
    let palette = Palette::get(&settings.palette_id);
    let grid_w = settings.grid_width.max(1);
    let grid_h = settings.grid_height.max(1);

    // The sample buffer is the source drawn at grid resolution, nearest
    // neighbor, so quantization runs 1:1
    let mut samples =
        image::imageops::resize(img, grid_w, grid_h, image::imageops::FilterType::Nearest);
    let grid = quantize_in_place(&mut samples, palette);

    encode_grids(&[(grid, f64::from(crate::animation::DEFAULT_DELAY_TICKS))], 1, 0, palette, settings)
}

fn run_animated(
    src: &AnimatedSource,
    settings: &ConvertSettings,
) -> Result<(Artifact, Vec<BudgetNote>)> {
    let palette = Palette::get(&settings.palette_id);
    let grid_w = settings.grid_width.max(1);
    let grid_h = settings.grid_height.max(1);

    let grids: Vec<(ColorGrid, f64)> = src
        .frames
        .iter()
        .map(|frame| {
            (
                quantize(&frame.image, grid_w, grid_h, palette),
                f64::from(frame.delay),
            )
        })
        .collect();

    encode_grids(&grids, grids.len(), src.loop_count, palette, settings)
}

fn encode_grids(
    grids: &[(ColorGrid, f64)],
    frame_count: usize,
    loop_count: u16,
    palette: &Palette,
    settings: &ConvertSettings,
) -> Result<(Artifact, Vec<BudgetNote>)> {
    let first = grids.first().ok_or(PixelGridError::EmptyGrid)?;
    let block = settings.block_size.max(1);

    match settings.format {
        OutputFormat::Png => {
            let img = expand_blocks(&first.0, block)?;
            Ok((Artifact::Png(encode_png(&img)?), Vec::new()))
        }
        OutputFormat::Svg => {
            // Vector export retains only the first frame's grid
            Ok((Artifact::Svg(render_svg(&first.0, block)?), Vec::new()))
        }
        OutputFormat::Gif => {
            let safe = safe_block_size(first.0.width(), first.0.height(), frame_count, block);
            let notes = if safe < block {
                vec![BudgetNote {
                    requested: block,
                    actual: safe,
                }]
            } else {
                Vec::new()
            };

            let lookup = PaletteLookup::build(&palette.hexes());
            let frames: Vec<AnimationFrame> = grids
                .iter()
                .map(|(grid, delay)| AnimationFrame {
                    grid: grid.clone(),
                    delay: *delay,
                })
                .collect();
            let bytes = encode_animation(&frames, safe, &lookup, loop_count)?;
            Ok((Artifact::Gif(bytes), notes))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
