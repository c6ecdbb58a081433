use std::io::Write;

use crate::data::model::{ExperimentRef, QuantitationType};
use crate::error::{DiagError, ScaleError};
use crate::integrity::{self, CheckMode, IntegrityReport, Outcome};
use crate::report::ScaleReportWriter;
use crate::scale::{self, ScaleVerdict};
use crate::source::{SampleSource, VectorStore};

// ---------------------------------------------------------------------------
// BatchSummary – per-run counters
// ---------------------------------------------------------------------------

/// A unit (experiment or vector) that failed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub key: String,
    pub message: String,
}

/// Counters for one driver run. Failures never stop the run; they are
/// collected here instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: Vec<Failure>,
}

impl BatchSummary {
    pub fn record_success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.processed += 1;
        self.failed.push(Failure {
            key: key.into(),
            message: message.into(),
        });
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Log the counts, then every failure.
    pub fn log(&self, what: &str) {
        log::info!(
            "{what}: processed {}, {} succeeded, {} failed",
            self.processed,
            self.succeeded,
            self.failed.len()
        );
        for f in &self.failed {
            log::error!("{}: {}", f.key, f.message);
        }
    }
}

// ---------------------------------------------------------------------------
// Scale check
// ---------------------------------------------------------------------------

/// Verdict for one experiment and quantitation type.
#[derive(Debug, Clone)]
pub struct ScaleRecord {
    pub experiment: ExperimentRef,
    pub quantitation_type: QuantitationType,
    pub verdict: ScaleVerdict,
}

#[derive(Debug, Default)]
pub struct ScaleRun {
    pub summary: BatchSummary,
    pub verdicts: Vec<ScaleRecord>,
}

/// Classify every quantitation type of every experiment of `source`,
/// writing one report record each.
///
/// Fetch and classification failures are recorded per unit. Report
/// write failures abort the run after the partial summary is logged.
pub fn run_scale_check<S, W>(
    source: &S,
    report: &mut ScaleReportWriter<W>,
    max_vectors: usize,
) -> Result<ScaleRun, DiagError>
where
    S: SampleSource + ?Sized,
    W: Write,
{
    let mut run = ScaleRun::default();
    let result = classify_all(source, report, max_vectors, &mut run);
    run.summary.log("Scale check");
    result.map(|()| run)
}

fn classify_all<S, W>(
    source: &S,
    report: &mut ScaleReportWriter<W>,
    max_vectors: usize,
    run: &mut ScaleRun,
) -> Result<(), DiagError>
where
    S: SampleSource + ?Sized,
    W: Write,
{
    for experiment in source.experiments() {
        log::info!("Processing {experiment}");
        let key = format!("experiment {experiment}");

        let types = match source.quantitation_types(&experiment) {
            Ok(types) => types,
            Err(e) => {
                log::error!("Could not fetch quantitation types for {experiment}: {e}");
                run.summary.record_failure(key, e.to_string());
                continue;
            }
        };
        if types.is_empty() {
            let e = ScaleError::EmptyInput;
            log::error!("{experiment}: {e}");
            run.summary.record_failure(key, e.to_string());
            continue;
        }

        for qt in types {
            let key = format!("{key} [{}]", qt.name);
            let verdict = source
                .sample_vectors(&experiment, &qt, max_vectors)
                .map_err(|e| e.to_string())
                .and_then(|vectors| {
                    scale::classify(&vectors, qt.scale).map_err(|e| e.to_string())
                });
            let verdict = match verdict {
                Ok(v) => v,
                Err(message) => {
                    log::error!("{experiment}, {qt}: {message}");
                    run.summary.record_failure(key, message);
                    continue;
                }
            };

            report.write(&experiment, &qt, &verdict)?;
            run.summary.record_success();
            run.verdicts.push(ScaleRecord {
                experiment: experiment.clone(),
                quantitation_type: qt,
                verdict,
            });
        }
    }
    report.flush()
}

// ---------------------------------------------------------------------------
// Integrity check
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct IntegrityRun {
    pub summary: BatchSummary,
    pub reports: Vec<IntegrityReport>,
    /// Quantitation types that had repaired vectors written back.
    pub groups_written: usize,
    pub vectors_written: usize,
}

impl IntegrityRun {
    pub fn repaired(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Repaired { .. }))
    }

    pub fn mismatched(&self) -> usize {
        self.count(|o| matches!(o, Outcome::SizeMismatch { .. }))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Check every quantitation-type group of `store`, writing back repaired
/// vectors group by group.
///
/// Store failures (fetching or writing back) abort the run after the
/// partial summary is logged.
pub fn run_integrity_check<S>(
    store: &mut S,
    mode: CheckMode,
    checkpoint_interval: usize,
) -> Result<IntegrityRun, DiagError>
where
    S: VectorStore + ?Sized,
{
    let mut run = IntegrityRun::default();
    let result = check_all(store, mode, checkpoint_interval, &mut run);
    run.summary.log("Vector check");
    result.map(|()| run)
}

fn check_all<S>(
    store: &mut S,
    mode: CheckMode,
    checkpoint_interval: usize,
    run: &mut IntegrityRun,
) -> Result<(), DiagError>
where
    S: VectorStore + ?Sized,
{
    for qt in store.quantitation_types()? {
        if !mode.examines(qt.representation) {
            log::debug!("Skipping {qt}");
            continue;
        }

        log::info!("Processing {qt}");
        let mut vectors = store.vectors(&qt)?;
        let group = integrity::check_group(&qt, &mut vectors, mode, checkpoint_interval);

        for report in &group.reports {
            match report.outcome {
                Outcome::SizeMismatch { .. } => run
                    .summary
                    .record_failure(vector_key(report.vector_id, &qt), report.to_string()),
                Outcome::Ok | Outcome::Repaired { .. } => run.summary.record_success(),
            }
        }
        for (id, e) in &group.failures {
            run.summary.record_failure(vector_key(*id, &qt), e.to_string());
        }

        // Only repaired members are written; mismatched ones never are.
        if group.needs_write_back() {
            let repaired: Vec<_> = group.repaired.iter().map(|&i| vectors[i].clone()).collect();
            log::info!(
                "Updating {} vectors of {qt} that contained 'tab'",
                repaired.len()
            );
            store.write_back(&repaired)?;
            run.groups_written += 1;
            run.vectors_written += repaired.len();
        }

        run.reports.extend(group.reports);
    }
    Ok(())
}

fn vector_key(id: i64, qt: &QuantitationType) -> String {
    format!("vector {id} [{}]", qt.name)
}
