//! Core stereo conversion logic and orchestration.
//!
//! This module organizes the conversion pipeline into one submodule per
//! stage and exposes the batch entry points built on top of them.
//!
//! Data flow for one job:
//! `locator` → `frame_pairs` → `compositor` → `sink`, driven by `batch`.

/// Frame, dimension and frame-rate types shared by every stage
pub mod frame;

/// Stream Locator: identifies the left/right eye and audio streams
pub mod locator;

/// Frame Pair Decoder: lock-step iteration over both eye streams
pub mod frame_pairs;

/// SBS Compositor: places each pair side by side in one frame
pub mod compositor;

/// Encode & Mux Sink: writes one output under its final name
pub mod sink;

/// Batch Orchestrator: per-file jobs, collision checks and isolation
pub mod batch;

/// MPO stereo stills to side-by-side JPEGs
pub mod stills;

pub use batch::{
    BatchResult, ConversionJob, JobFailure, JobStatus, JobSuccess, OutputDetail, run_batch,
};
pub use compositor::compose;
pub use frame_pairs::FramePairs;
pub use locator::{SourceAsset, locate};
pub use sink::encode_and_mux;
pub use stills::{convert_still, run_stills_batch};
