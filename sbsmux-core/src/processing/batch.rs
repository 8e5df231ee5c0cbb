// ============================================================================
// sbsmux-core/src/processing/batch.rs
// ============================================================================
//
// BATCH ORCHESTRATOR: Jobs, Collision Checks and Failure Isolation
//
// This module turns an input path into a list of ConversionJobs and runs the
// conversion pipeline once per job.
//
// WORKFLOW:
// 1. Validate the configuration and create the output directory
// 2. Resolve inputs (single file, or top-level directory scan)
// 3. Plan outputs and mark later claimants of an already-claimed output
//    name as Failed(PathConflict) before anything runs
// 4. Run every Pending job: sequentially, or on a dedicated rayon pool when
//    `jobs > 1`
// 5. Collect the terminal job states into a BatchResult
//
// Every job runs under `catch_unwind`: an error or a panic in one pipeline
// becomes that job's Failed status and never reaches the other jobs.

use crate::config::{CoreConfig, INPUT_EXTENSION, OUTPUT_SUFFIX};
use crate::discovery::resolve_inputs;
use crate::error::{CoreError, CoreResult, FailureKind};
use crate::external::{EncoderSettings, MediaToolkit};
use crate::processing::frame::{Dimensions, FrameRate};
use crate::processing::frame_pairs::FramePairs;
use crate::processing::locator::locate;
use crate::processing::sink::encode_and_mux;
use crate::reporting::{BatchStartInfo, JobStartInfo, Reporter};
use crate::utils::output_file_name;

use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

// ============================================================================
// JOB MODEL
// ============================================================================

/// What a successful job produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputDetail {
    Video {
        frame_pairs: u64,
        frame_rate: FrameRate,
        dimensions: Dimensions,
        audio: bool,
        /// Frames of the longer eye stream left unpaired, when the container reports counts
        discarded_frames: Option<u64>,
    },
    Still {
        dimensions: Dimensions,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSuccess {
    pub output_path: PathBuf,
    pub output_size: u64,
    pub elapsed_secs: f64,
    pub detail: OutputDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&CoreError> for JobFailure {
    fn from(err: &CoreError) -> Self {
        Self {
            kind: err.failure_kind(),
            message: err.to_string(),
        }
    }
}

/// Lifecycle of one job: Pending → Running → {Succeeded, Failed}.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded(JobSuccess),
    Failed(JobFailure),
}

/// One input file and its planned output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub status: JobStatus,
}

impl ConversionJob {
    pub fn new(input: PathBuf, output: PathBuf) -> Self {
        Self {
            input,
            output,
            status: JobStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Succeeded(_) | JobStatus::Failed(_))
    }

    pub fn success(&self) -> Option<&JobSuccess> {
        match &self.status {
            JobStatus::Succeeded(success) => Some(success),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match &self.status {
            JobStatus::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    fn fail(&mut self, failure: JobFailure) {
        self.status = JobStatus::Failed(failure);
    }
}

/// Outcome of one batch, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub jobs: Vec<ConversionJob>,
    pub elapsed_secs: f64,
}

impl BatchResult {
    pub fn succeeded_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.success().is_some()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.failure().is_some()).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.jobs.iter().all(|j| j.success().is_some())
    }

    /// Total bytes written by successful jobs.
    pub fn total_output_size(&self) -> u64 {
        self.jobs
            .iter()
            .filter_map(|j| j.success())
            .map(|s| s.output_size)
            .sum()
    }
}

// ============================================================================
// VIDEO BATCH
// ============================================================================

/// Converts every Fuji 3D AVI found at `input` into a side-by-side MP4.
///
/// `input` is either one `.avi` file or a directory whose top-level `.avi`
/// files (case-insensitive) are converted in lexicographic order.
///
/// # Errors
///
/// Only pre-flight failures are returned as `Err`: an invalid configuration,
/// an unusable input path, no eligible files, or an output directory that
/// cannot be created. Per-file failures are reported in the `BatchResult`.
pub fn run_batch<T>(
    toolkit: &T,
    reporter: &dyn Reporter,
    config: &CoreConfig,
    input: &Path,
) -> CoreResult<BatchResult>
where
    T: MediaToolkit + Sync + ?Sized,
{
    let inputs = resolve_inputs(input, &[INPUT_EXTENSION])?;
    let settings = EncoderSettings::from(config);

    run_jobs(
        config,
        reporter,
        inputs,
        |path| output_file_name(path, OUTPUT_SUFFIX),
        |job| convert_video(toolkit, reporter, &settings, job),
    )
}

/// Runs the stereo pipeline for one job.
fn convert_video<T>(
    toolkit: &T,
    reporter: &dyn Reporter,
    settings: &EncoderSettings,
    job: &ConversionJob,
) -> CoreResult<OutputDetail>
where
    T: MediaToolkit + ?Sized,
{
    let asset = locate(toolkit, &job.input)?;
    reporter.source_located(&asset);

    let discarded_frames = asset.surplus_frames();
    if let Some(surplus) = discarded_frames.filter(|n| *n > 0) {
        reporter.warning(&format!(
            "{}: eye streams differ by {} frame(s); output stops at the shorter stream",
            job.input.display(),
            surplus
        ));
    }

    let pairs = FramePairs::open(toolkit, &asset)?;
    let summary = encode_and_mux(toolkit, &asset, pairs, settings, &job.output, reporter)?;

    Ok(OutputDetail::Video {
        frame_pairs: summary.frame_pairs,
        frame_rate: asset.frame_rate,
        dimensions: asset.sbs_dimensions(),
        audio: summary.has_audio,
        discarded_frames,
    })
}

// ============================================================================
// SHARED JOB RUNNER
// ============================================================================

/// Plans, runs and collects one job per input.
///
/// `name_output` maps an input path to its output file name; `process` runs
/// the pipeline for one job and must only write `job.output`.
pub(crate) fn run_jobs<N, F>(
    config: &CoreConfig,
    reporter: &dyn Reporter,
    inputs: Vec<PathBuf>,
    name_output: N,
    process: F,
) -> CoreResult<BatchResult>
where
    N: Fn(&Path) -> CoreResult<String>,
    F: Fn(&ConversionJob) -> CoreResult<OutputDetail> + Sync,
{
    config.validate()?;
    std::fs::create_dir_all(&config.output_dir).map_err(|e| {
        CoreError::PathError(format!(
            "Failed to create output directory {}: {}",
            config.output_dir.display(),
            e
        ))
    })?;

    let started = Instant::now();
    let mut jobs = plan_jobs(&config.output_dir, inputs, name_output);
    let total = jobs.len();

    log::info!(
        "Starting batch of {} file(s) into {}",
        total,
        config.output_dir.display()
    );
    reporter.batch_started(&BatchStartInfo {
        inputs: jobs.iter().map(|j| j.input.clone()).collect(),
        output_dir: config.output_dir.clone(),
        jobs: config.jobs,
    });

    for job in jobs.iter().filter(|j| j.is_terminal()) {
        reporter.job_complete(job);
    }

    let run = |(position, job): (usize, &mut ConversionJob)| {
        if matches!(job.status, JobStatus::Pending) {
            run_job(job, position + 1, total, reporter, &process);
        }
    };

    if config.jobs <= 1 || total <= 1 {
        jobs.iter_mut().enumerate().for_each(run);
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.jobs.min(total))
            .thread_name(|i| format!("sbsmux-job-{i}"))
            .build()
            .map_err(|e| CoreError::OperationFailed(format!("Failed to start job pool: {e}")))?;
        pool.install(|| jobs.par_iter_mut().enumerate().for_each(run));
    }

    let result = BatchResult {
        jobs,
        elapsed_secs: started.elapsed().as_secs_f64(),
    };
    log::info!(
        "Batch complete: {} of {} succeeded",
        result.succeeded_count(),
        result.jobs.len()
    );
    reporter.batch_complete(&result);
    Ok(result)
}

/// Builds jobs in input order and fails every later claimant of an output name.
///
/// Names are compared case-insensitively so that two inputs never overwrite
/// each other on a case-insensitive filesystem.
fn plan_jobs<N>(output_dir: &Path, inputs: Vec<PathBuf>, name_output: N) -> Vec<ConversionJob>
where
    N: Fn(&Path) -> CoreResult<String>,
{
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();
    let mut jobs = Vec::with_capacity(inputs.len());

    for input in inputs {
        let name = match name_output(&input) {
            Ok(name) => name,
            Err(e) => {
                let mut job = ConversionJob::new(input, output_dir.to_path_buf());
                job.fail(JobFailure::from(&e));
                jobs.push(job);
                continue;
            }
        };

        let output = output_dir.join(&name);
        let mut job = ConversionJob::new(input, output);
        match claimed.get(&name.to_lowercase()) {
            Some(first) => {
                let err = CoreError::PathConflict {
                    output: job.output.clone(),
                    claimed_by: first.clone(),
                };
                log::warn!("{}: {}", job.input.display(), err);
                job.fail(JobFailure::from(&err));
            }
            None => {
                claimed.insert(name.to_lowercase(), job.input.clone());
            }
        }
        jobs.push(job);
    }
    jobs
}

fn run_job<F>(
    job: &mut ConversionJob,
    position: usize,
    total: usize,
    reporter: &dyn Reporter,
    process: &F,
) where
    F: Fn(&ConversionJob) -> CoreResult<OutputDetail>,
{
    job.status = JobStatus::Running;
    log::info!(
        "Processing file {} of {}: {}",
        position,
        total,
        job.input.display()
    );
    reporter.job_started(&JobStartInfo {
        position,
        total,
        input: job.input.clone(),
        output: job.output.clone(),
    });

    let started = Instant::now();
    let current: &ConversionJob = job;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| process(current)));

    job.status = match outcome {
        Ok(Ok(detail)) => {
            let output_size = std::fs::metadata(&job.output).map(|m| m.len()).unwrap_or(0);
            log::info!(
                "Finished {} -> {} in {:.1}s",
                job.input.display(),
                job.output.display(),
                started.elapsed().as_secs_f64()
            );
            JobStatus::Succeeded(JobSuccess {
                output_path: job.output.clone(),
                output_size,
                elapsed_secs: started.elapsed().as_secs_f64(),
                detail,
            })
        }
        Ok(Err(e)) => {
            log::error!("{} failed: {}", job.input.display(), e);
            JobStatus::Failed(JobFailure::from(&e))
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            log::error!("{} panicked: {}", job.input.display(), reason);
            JobStatus::Failed(JobFailure {
                kind: FailureKind::Other,
                message: format!("pipeline panicked: {reason}"),
            })
        }
    };
    reporter.job_complete(job);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
