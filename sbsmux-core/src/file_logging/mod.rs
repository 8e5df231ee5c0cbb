pub mod setup;

pub use setup::setup_file_logging;

use crate::processing::batch::{BatchResult, ConversionJob, JobStatus, OutputDetail};
use crate::processing::locator::SourceAsset;
use crate::reporting::{BatchStartInfo, JobProgress, JobStartInfo, Reporter, ReporterError};
use crate::utils::{format_bytes, format_duration};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Reporter that writes batch events to the `log` facade, for the run log file.
pub struct LogReporter {
    last_logged: Mutex<HashMap<PathBuf, (u64, Instant)>>,
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl LogReporter {
    pub fn new() -> Self {
        Self {
            last_logged: Mutex::new(HashMap::new()),
        }
    }

    /// Progress is logged every 10% or at least every five minutes.
    fn should_log_progress(&self, progress: &JobProgress) -> bool {
        let Ok(mut last) = self.last_logged.lock() else {
            return false;
        };
        let now = Instant::now();
        let current = progress.percent().map(|p| p as u64).unwrap_or(0);
        match last.get(&progress.input) {
            Some((percent, at)) => {
                let milestone = progress.percent().is_some() && current >= percent + 10;
                let time_fallback = now.duration_since(*at) >= Duration::from_secs(300);
                if milestone || time_fallback {
                    last.insert(progress.input.clone(), (current, now));
                    true
                } else {
                    false
                }
            }
            None => {
                last.insert(progress.input.clone(), (current, now));
                true
            }
        }
    }
}

impl Reporter for LogReporter {
    fn batch_started(&self, info: &BatchStartInfo) {
        info!("Starting batch of {} file(s)", info.inputs.len());
        for (i, input) in info.inputs.iter().enumerate() {
            info!("  {}. {}", i + 1, input.display());
        }
        info!("Output directory: {}", info.output_dir.display());
        info!("Parallel jobs: {}", info.jobs);
    }

    fn job_started(&self, info: &JobStartInfo) {
        info!(
            "Job {} of {}: {} -> {}",
            info.position,
            info.total,
            info.input.display(),
            info.output.display()
        );
    }

    fn source_located(&self, asset: &SourceAsset) {
        info!(
            "Streams: left {}, right {}, audio {}",
            asset.left_stream,
            asset.right_stream,
            asset
                .audio_stream
                .map(|i| i.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        info!(
            "Eye size {}, frame rate {} ({:.3} fps)",
            asset.eye_dimensions,
            asset.frame_rate,
            asset.frame_rate.as_f64()
        );
        match (asset.left_frame_count, asset.right_frame_count) {
            (Some(left), Some(right)) if left != right => warn!(
                "Eye streams differ in length (left {left}, right {right}); {} surplus frame(s) will be dropped",
                left.abs_diff(right)
            ),
            (Some(left), Some(_)) => debug!("Both eye streams report {left} frames"),
            _ => debug!("Container does not report frame counts"),
        }
    }

    fn job_progress(&self, progress: &JobProgress) {
        if !self.should_log_progress(progress) {
            return;
        }
        match (progress.percent(), progress.frames_total) {
            (Some(percent), Some(total)) => info!(
                "Progress {}: {:.1}% ({}/{} frames)",
                progress.input.display(),
                percent,
                progress.frames_done,
                total
            ),
            _ => info!(
                "Progress {}: {} frames",
                progress.input.display(),
                progress.frames_done
            ),
        }
    }

    fn job_complete(&self, job: &ConversionJob) {
        if let Ok(mut last) = self.last_logged.lock() {
            last.remove(&job.input);
        }
        match &job.status {
            JobStatus::Succeeded(success) => {
                info!("Completed {}", job.input.display());
                info!(
                    "  Output: {} ({})",
                    success.output_path.display(),
                    format_bytes(success.output_size)
                );
                if let OutputDetail::Video {
                    frame_pairs,
                    frame_rate,
                    dimensions,
                    audio,
                    discarded_frames,
                } = &success.detail
                {
                    info!("  Frames: {frame_pairs} at {frame_rate}, {dimensions}");
                    info!("  Audio: {}", if *audio { "copied" } else { "none" });
                    if let Some(discarded) = discarded_frames.filter(|n| *n > 0) {
                        info!("  Discarded surplus frames: {discarded}");
                    }
                }
                info!("  Time: {}", format_duration(success.elapsed_secs));
            }
            JobStatus::Failed(failure) => {
                error!(
                    "Failed {}: {} - {}",
                    job.input.display(),
                    failure.kind,
                    failure.message
                );
            }
            JobStatus::Pending | JobStatus::Running => {}
        }
    }

    fn warning(&self, message: &str) {
        warn!("{message}");
    }

    fn error(&self, err: &ReporterError) {
        error!("{}: {}", err.title, err.message);
        if let Some(ctx) = &err.context {
            error!("Context: {ctx}");
        }
        if let Some(sug) = &err.suggestion {
            error!("Suggestion: {sug}");
        }
    }

    fn batch_complete(&self, result: &BatchResult) {
        info!(
            "Batch complete: {} of {} succeeded, {} failed",
            result.succeeded_count(),
            result.jobs.len(),
            result.failed_count()
        );
        info!("Total written: {}", format_bytes(result.total_output_size()));
        info!("Total time: {}", format_duration(result.elapsed_secs));
        for job in &result.jobs {
            if let Some(failure) = job.failure() {
                info!("  {} - {}", job.input.display(), failure.kind);
            }
        }
    }
}
