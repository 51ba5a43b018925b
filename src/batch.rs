// this_file: src/batch.rs
//! Batch rendering from a JSON job specification.
//!
//! Jobs render in parallel on the rayon pool. Every job gets its own source
//! photo and surface; the font library is shared read-only. Results come
//! back in input order, one per job, whether it succeeded or not.

use crate::compose::QuoteRenderer;
use crate::config::QuoteDefaults;
use crate::encode::Encoder;
use crate::error::{Error, Result};
use crate::logging::Timer;
use crate::security::{validate_job_count, validate_json_size, validate_relative_path};
use crate::source::ImageSource;
use camino::Utf8PathBuf;
use log::{error, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// A set of cards to render.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchSpec {
    /// Specification version (expected: "1.x")
    pub version: String,
    pub jobs: Vec<BatchJob>,
}

/// One card.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchJob {
    /// Unique job identifier
    pub id: String,
    pub quote: String,
    /// Falls back to the configured default author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Relative output path; `<id>.jpg` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Utf8PathBuf>,
}

impl BatchJob {
    fn output_path(&self) -> Utf8PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from(format!("{}.jpg", self.id)))
    }
}

/// Outcome of one job, serialized as one JSONL line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub id: String,
    /// "success" or "error"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of wrapped quote lines
    pub lines: usize,
    pub processing_time_ms: u64,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Parse and validate a batch specification.
pub fn parse_batch_spec(json: &str) -> Result<BatchSpec> {
    validate_json_size(json)?;
    let spec: BatchSpec = serde_json::from_str(json)?;

    if !spec.version.starts_with("1.") && spec.version != "1" {
        return Err(Error::InvalidParameter(format!(
            "Unsupported batch spec version: {}",
            spec.version
        )));
    }
    validate_job_count(spec.jobs.len())?;

    let mut seen = HashSet::new();
    for job in &spec.jobs {
        if job.id.trim().is_empty() {
            return Err(Error::InvalidParameter("Job id must not be empty".into()));
        }
        if !seen.insert(job.id.as_str()) {
            return Err(Error::InvalidParameter(format!(
                "Duplicate job id: {}",
                job.id
            )));
        }
        validate_relative_path(&job.output_path())?;
    }
    Ok(spec)
}

/// Serialize a job result as a single JSON line.
pub fn serialize_job_result(result: &JobResult) -> Result<String> {
    Ok(serde_json::to_string(result)?)
}

/// Renders every job of a [`BatchSpec`] into an output directory.
pub struct BatchRunner<'a> {
    renderer: &'a QuoteRenderer,
    source: &'a dyn ImageSource,
    encoder: &'a dyn Encoder,
    defaults: &'a QuoteDefaults,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        renderer: &'a QuoteRenderer,
        source: &'a dyn ImageSource,
        encoder: &'a dyn Encoder,
        defaults: &'a QuoteDefaults,
    ) -> Self {
        Self {
            renderer,
            source,
            encoder,
            defaults,
        }
    }

    /// Render all jobs; results keep input order.
    pub fn run(&self, spec: &BatchSpec, output_dir: &Path) -> Result<Vec<JobResult>> {
        let timer = Timer::new(format!("batch of {} job(s)", spec.jobs.len()));
        fs::create_dir_all(output_dir)?;

        let results: Vec<JobResult> = spec
            .jobs
            .par_iter()
            .map(|job| self.run_job(job, output_dir))
            .collect();

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            "Batch finished: {} ok, {} failed in {}ms on {} thread(s)",
            results.len() - failed,
            failed,
            timer.elapsed_ms(),
            rayon::current_num_threads()
        );
        Ok(results)
    }

    fn run_job(&self, job: &BatchJob, output_dir: &Path) -> JobResult {
        let start = Instant::now();
        let output = output_dir.join(job.output_path().as_std_path());

        let (status, lines, error) = match self.render_job(job, &output) {
            Ok(lines) => ("success", lines, None),
            Err(e) => {
                error!("Job {} failed: {}", job.id, e);
                ("error", 0, Some(e.to_string()))
            }
        };

        JobResult {
            id: job.id.clone(),
            status: status.to_string(),
            output: error.is_none().then(|| output.display().to_string()),
            error,
            lines,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn render_job(&self, job: &BatchJob, output: &Path) -> Result<usize> {
        let quote = self
            .defaults
            .quote(Some(job.quote.clone()), job.author.clone());
        let source = self.source.fetch()?;
        let composition = self.renderer.compose(&quote, &source)?;
        let bytes = self.encoder.encode_to_vec(&composition.surface)?;

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, bytes)?;
        Ok(composition.lines.len())
    }
}
