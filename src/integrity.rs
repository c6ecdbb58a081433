//! Size checks and tab-artifact repair for stored vectors.
//!
//! A string vector may contain elements that are a single tab, left behind
//! by an old encoding bug. Those elements are dropped; if the remaining
//! count matches the bio-assay dimension the vector is re-encoded in place.
//! Any other count mismatch is reported and left alone.

use std::fmt;

use serde::Deserialize;

use crate::data::codec;
use crate::data::model::{EncodedVector, ExperimentRef, PrimitiveType, QuantitationType};
use crate::error::CodecError;

/// The one element value treated as a repairable artifact.
pub const TAB_ARTIFACT: &str = "\t";

/// Which vectors get examined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// Only string vectors (cheap).
    #[default]
    StringOnly,
    /// Every vector, whatever its representation. Slow.
    Full,
}

impl CheckMode {
    pub fn examines(self, representation: PrimitiveType) -> bool {
        representation.is_textual() || self == CheckMode::Full
    }
}

/// Terminal state of one checked vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    /// Artifacts were dropped and the payload re-encoded.
    Repaired { dropped: usize },
    SizeMismatch { expected: usize, observed: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityReport {
    pub vector_id: i64,
    pub quantitation_type: String,
    pub experiment: ExperimentRef,
    pub outcome: Outcome,
}

impl fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vector {} [{}]: ", self.vector_id, self.quantitation_type)?;
        match self.outcome {
            Outcome::Ok => write!(f, "ok"),
            Outcome::Repaired { dropped } => write!(f, "repaired, dropped {dropped} tab(s)"),
            Outcome::SizeMismatch { expected, observed } => {
                write!(f, "expected {expected} values, got {observed}; {}", self.experiment)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Single vector
// ---------------------------------------------------------------------------

/// Check one vector, repairing tab artifacts in string payloads.
///
/// Returns `Ok(None)` when `mode` does not examine the vector's
/// representation. On `Repaired` the vector's payload has been replaced.
pub fn check(
    vector: &mut EncodedVector,
    mode: CheckMode,
) -> Result<Option<IntegrityReport>, CodecError> {
    let representation = vector.representation();
    if !mode.examines(representation) {
        return Ok(None);
    }

    let outcome = if representation.is_textual() {
        check_strings(vector)?
    } else {
        check_fixed(vector, representation)?
    };

    Ok(Some(IntegrityReport {
        vector_id: vector.id,
        quantitation_type: vector.quantitation_type.name.clone(),
        experiment: vector.experiment.clone(),
        outcome,
    }))
}

fn check_strings(vector: &mut EncodedVector) -> Result<Outcome, CodecError> {
    let raw = codec::decode_strings(&vector.data)?;
    let total = raw.len();
    let kept: Vec<String> = raw.into_iter().filter(|s| s != TAB_ARTIFACT).collect();
    let dropped = total - kept.len();

    if kept.len() != vector.expected_count {
        log::error!(
            "Vector {} did not have right number of values after 'tab' removal \
             for {}; expected {} got {}; {}",
            vector.id,
            vector.quantitation_type,
            vector.expected_count,
            kept.len(),
            vector.experiment
        );
        return Ok(Outcome::SizeMismatch {
            expected: vector.expected_count,
            observed: kept.len(),
        });
    }

    if dropped == 0 {
        return Ok(Outcome::Ok);
    }
    vector.data = codec::encode_strings(&kept)?;
    Ok(Outcome::Repaired { dropped })
}

fn check_fixed(
    vector: &EncodedVector,
    representation: PrimitiveType,
) -> Result<Outcome, CodecError> {
    let values = codec::decode(&vector.data, representation)?;
    if values.len() == vector.expected_count {
        return Ok(Outcome::Ok);
    }

    log::error!(
        "Vector {} did not have right number of values {}; expected {} got {}; {}",
        vector.id,
        vector.quantitation_type,
        vector.expected_count,
        values.len(),
        vector.experiment
    );
    if log::log_enabled!(log::Level::Debug) {
        let joined: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        log::debug!("Values:\n{}", joined.join(","));
    }
    Ok(Outcome::SizeMismatch {
        expected: vector.expected_count,
        observed: values.len(),
    })
}

// ---------------------------------------------------------------------------
// Quantitation-type group
// ---------------------------------------------------------------------------

/// Accumulated outcomes for every vector of one quantitation type.
#[derive(Debug)]
pub struct GroupOutcome {
    pub quantitation_type: QuantitationType,
    pub reports: Vec<IntegrityReport>,
    /// Positions, in the checked slice, of vectors whose payload was
    /// repaired and needs writing back.
    pub repaired: Vec<usize>,
    /// Vectors whose payload could not be decoded or re-encoded.
    pub failures: Vec<(i64, CodecError)>,
}

impl GroupOutcome {
    fn new(quantitation_type: QuantitationType) -> Self {
        Self {
            quantitation_type,
            reports: Vec::new(),
            repaired: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &IntegrityReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::SizeMismatch { .. }))
    }

    pub fn needs_write_back(&self) -> bool {
        !self.repaired.is_empty()
    }
}

/// Whether `count` examined vectors is a checkpoint. An interval of 0
/// disables checkpoints.
fn at_checkpoint(count: usize, interval: usize) -> bool {
    interval > 0 && count % interval == 0
}

/// Check every vector of one quantitation type.
///
/// Each vector is judged on its own; a mismatch or decode failure never
/// stops the rest of the group. `vectors` is modified in place for
/// repaired members only.
pub fn check_group(
    quantitation_type: &QuantitationType,
    vectors: &mut [EncodedVector],
    mode: CheckMode,
    checkpoint_interval: usize,
) -> GroupOutcome {
    let mut group = GroupOutcome::new(quantitation_type.clone());
    let mut count = 0usize;

    for (position, vector) in vectors.iter_mut().enumerate() {
        match check(vector, mode) {
            Ok(Some(report)) => {
                if matches!(report.outcome, Outcome::Repaired { .. }) {
                    group.repaired.push(position);
                }
                group.reports.push(report);
            }
            Ok(None) => continue,
            Err(e) => {
                log::error!(
                    "Vector {} of {} could not be checked: {e}",
                    vector.id,
                    quantitation_type
                );
                group.failures.push((vector.id, e));
            }
        }

        count += 1;
        if at_checkpoint(count, checkpoint_interval) {
            log::info!("Processed {count} vectors for {quantitation_type}");
        }
    }
    group
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use proptest::prelude::*;

    fn string_qt() -> QuantitationType {
        QuantitationType::new("Call", PrimitiveType::String)
    }

    fn string_vector(id: i64, values: &[&str], expected: usize) -> EncodedVector {
        EncodedVector {
            id,
            experiment: ExperimentRef::new(1, "GSE1"),
            quantitation_type: string_qt(),
            expected_count: expected,
            data: codec::encode_strings(values).unwrap(),
        }
    }

    fn double_vector(id: i64, values: &[f64], expected: usize) -> EncodedVector {
        EncodedVector {
            id,
            experiment: ExperimentRef::new(1, "GSE1"),
            quantitation_type: QuantitationType::new("signal", PrimitiveType::Double),
            expected_count: expected,
            data: codec::encode_doubles(values),
        }
    }

    #[test]
    fn clean_strings_are_ok() {
        let mut v = string_vector(1, &["P", "A", "M"], 3);
        let before = v.data.clone();
        let report = check(&mut v, CheckMode::StringOnly).unwrap().unwrap();
        assert_eq!(report.outcome, Outcome::Ok);
        assert_eq!(v.data, before);
    }

    #[test]
    fn tab_dropped_and_count_matches_is_repaired() {
        let mut v = string_vector(2, &["A", "\t", "B", "C", "D"], 4);
        let report = check(&mut v, CheckMode::StringOnly).unwrap().unwrap();
        assert_eq!(report.outcome, Outcome::Repaired { dropped: 1 });
        assert_eq!(codec::decode_strings(&v.data).unwrap(), ["A", "B", "C", "D"]);
    }

    #[test]
    fn tab_dropped_and_count_short_is_mismatch_without_rewrite() {
        let mut v = string_vector(3, &["A", "\t", "B", "C", "D"], 5);
        let before = v.data.clone();
        let report = check(&mut v, CheckMode::StringOnly).unwrap().unwrap();
        assert_eq!(
            report.outcome,
            Outcome::SizeMismatch {
                expected: 5,
                observed: 4
            }
        );
        assert_eq!(v.data, before);
    }

    #[test]
    fn repaired_vector_checks_ok_the_second_time() {
        let mut v = string_vector(4, &["\t", "x", "\t", "y"], 2);
        let first = check(&mut v, CheckMode::Full).unwrap().unwrap();
        assert_eq!(first.outcome, Outcome::Repaired { dropped: 2 });
        let second = check(&mut v, CheckMode::Full).unwrap().unwrap();
        assert_eq!(second.outcome, Outcome::Ok);
    }

    #[test]
    fn embedded_tabs_are_not_artifacts() {
        let mut v = string_vector(5, &["a\t", "\t\t", " \t"], 3);
        let report = check(&mut v, CheckMode::StringOnly).unwrap().unwrap();
        assert_eq!(report.outcome, Outcome::Ok);
    }

    #[test]
    fn numeric_vectors_skipped_unless_full() {
        let mut v = double_vector(6, &[1.0, 2.0], 3);
        assert_eq!(check(&mut v, CheckMode::StringOnly).unwrap(), None);

        let report = check(&mut v, CheckMode::Full).unwrap().unwrap();
        assert_eq!(
            report.outcome,
            Outcome::SizeMismatch {
                expected: 3,
                observed: 2
            }
        );
    }

    #[test]
    fn numeric_vector_with_right_size_is_ok() {
        let mut v = double_vector(7, &[1.0, f64::NAN, 3.0], 3);
        let report = check(&mut v, CheckMode::Full).unwrap().unwrap();
        assert_eq!(report.outcome, Outcome::Ok);
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let mut v = double_vector(8, &[1.0], 1);
        v.data.push(0);
        assert!(matches!(
            check(&mut v, CheckMode::Full),
            Err(CodecError::Decode(DecodeError::Misaligned { .. }))
        ));
    }

    #[test]
    fn group_accumulates_each_vector_independently() {
        let mut vectors = vec![
            string_vector(10, &["A", "B"], 2),
            string_vector(11, &["A", "\t", "B", "C"], 4),
            string_vector(12, &["\t", "B"], 2),
            string_vector(13, &["A", "\t", "B"], 2),
        ];
        vectors[2].data.truncate(3);

        let group = check_group(&string_qt(), &mut vectors, CheckMode::StringOnly, 2);

        assert_eq!(group.reports.len(), 3);
        assert_eq!(group.failures.len(), 1);
        assert_eq!(group.failures[0].0, 12);
        assert_eq!(group.repaired, vec![3]);
        assert_eq!(group.mismatches().map(|r| r.vector_id).collect::<Vec<_>>(), vec![11]);
        assert!(group.needs_write_back());
    }

    #[test]
    fn group_without_repairs_needs_no_write_back() {
        let mut vectors = vec![
            string_vector(20, &["A"], 1),
            string_vector(21, &["A", "\t"], 2),
        ];
        let group = check_group(&string_qt(), &mut vectors, CheckMode::StringOnly, 10_000);
        assert!(!group.needs_write_back());
        assert!(group.repaired.is_empty());
    }

    #[test]
    fn repaired_positions_distinguish_duplicate_ids() {
        let mut vectors = vec![
            string_vector(7, &["A", "\t", "B"], 3),
            string_vector(7, &["A", "\t", "B"], 2),
        ];
        let group = check_group(&string_qt(), &mut vectors, CheckMode::StringOnly, 10_000);
        assert_eq!(group.repaired, vec![1]);
        assert_eq!(codec::decode_strings(&vectors[0].data).unwrap(), ["A", "\t", "B"]);
        assert_eq!(codec::decode_strings(&vectors[1].data).unwrap(), ["A", "B"]);
    }

    #[test]
    fn checkpoints_fall_on_multiples_of_the_interval() {
        let hits: Vec<usize> = (1..=25).filter(|&n| at_checkpoint(n, 10)).collect();
        assert_eq!(hits, vec![10, 20]);
        assert!(at_checkpoint(1, 1));
        assert!(at_checkpoint(10_000, 10_000));
        assert!(!at_checkpoint(9_999, 10_000));
        assert!((1..100).all(|n| !at_checkpoint(n, 0)));
    }

    #[test]
    fn mode_deserializes_from_snake_case() {
        let mode: CheckMode = serde_json::from_str("\"full\"").unwrap();
        assert_eq!(mode, CheckMode::Full);
        let mode: CheckMode = serde_json::from_str("\"string_only\"").unwrap();
        assert_eq!(mode, CheckMode::StringOnly);
    }

    proptest! {
        #[test]
        fn strings_without_bare_tabs_are_ok(
            values in proptest::collection::vec(".*", 0..12)
                .prop_filter("no bare tabs", |vs| vs.iter().all(|s| s != "\t"))
        ) {
            let refs: Vec<&str> = values.iter().map(String::as_str).collect();
            let mut v = string_vector(1, &refs, values.len());
            let report = check(&mut v, CheckMode::StringOnly).unwrap().unwrap();
            prop_assert_eq!(report.outcome, Outcome::Ok);
            prop_assert_eq!(codec::decode_strings(&v.data).unwrap(), values);
        }
    }
}
