//! Parallel extraction of independent projects.
//!
//! Each rayon task opens its own [`VideoSource`](crate::VideoSource) and
//! writes only below its own project directory, so tasks share nothing but
//! the read-only pipeline configuration.
//!
//! The public API is exposed through
//! [`ExtractionPipeline::run_batch`](crate::ExtractionPipeline::run_batch);
//! this module contains only the internal implementation.

use std::path::Path;

use ::rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::error::SceneSnapError;
use crate::pipeline::{ExtractionOutcome, ExtractionPipeline};

pub(crate) fn run_parallel<P>(
    pipeline: &ExtractionPipeline,
    jobs: &[(String, P)],
) -> Vec<Result<ExtractionOutcome, SceneSnapError>>
where
    P: AsRef<Path> + Sync,
{
    log::info!(
        "Extracting {} project(s) on {} thread(s)",
        jobs.len(),
        ::rayon::current_num_threads()
    );

    jobs.par_iter()
        .map(|(project_id, video_path)| pipeline.run(project_id, video_path))
        .collect()
}
