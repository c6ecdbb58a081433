//! Decide whether an experiment's values are already log-transformed.
//!
//! Declared scale metadata is trusted outright. Without it, the pooled
//! finite values are summarised and a short list of range rules is applied in
//! order:
//!
//! | rule | condition | verdict |
//! |------|-----------|---------|
//! | narrow range | `max - min < 10` | possibly log |
//! | large values | `max > 50` | not log |
//! | small values | `min < 1` | not log |
//! | otherwise | | possibly log |
//!
//! The thresholds are heuristics with no documented derivation. Do not
//! tune them without sign-off from whoever consumes the report.

use std::fmt;

use crate::data::model::{SampleVector, Scale};
use crate::error::ScaleError;
use crate::stats::Summary;

/// A range narrower than this is consistent with log-transformed data.
pub const NARROW_RANGE: f64 = 10.0;
/// Values above this are too large for log-transformed intensities.
pub const LARGE_VALUE: f64 = 50.0;
/// Values below this are too small once the range is wide.
pub const SMALL_VALUE: f64 = 1.0;

/// Log scales that short-circuit inference when declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogScale {
    Log2,
    Log10,
    UnknownBase,
}

/// Where the verdict comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleSource {
    Declared(LogScale),
    Inferred,
}

impl ScaleSource {
    /// Linear or unspecified scales fall through to inference.
    pub fn from_declared(scale: Option<Scale>) -> Self {
        match scale {
            Some(Scale::Log2) => ScaleSource::Declared(LogScale::Log2),
            Some(Scale::Log10) => ScaleSource::Declared(LogScale::Log10),
            Some(Scale::LogUnknownBase) => ScaleSource::Declared(LogScale::UnknownBase),
            Some(Scale::Linear) | None => ScaleSource::Inferred,
        }
    }
}

/// The range rule that decided an inferred verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    NarrowRange,
    LargeValues,
    SmallValues,
    CannotRuleOut,
}

/// Statistics behind an inferred verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evidence {
    pub summary: Summary,
    pub rule: Rule,
}

/// Outcome of classifying one experiment's quantitation type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleVerdict {
    DeclaredLog2,
    DeclaredLog10,
    DeclaredLogUnknownBase,
    PossiblyLog(Evidence),
    NotLog(Evidence),
}

impl ScaleVerdict {
    /// Computed statistics; `None` for declared verdicts.
    pub fn evidence(&self) -> Option<&Evidence> {
        match self {
            ScaleVerdict::PossiblyLog(e) | ScaleVerdict::NotLog(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the data is (or may be) on a log scale.
    pub fn is_log(&self) -> bool {
        !matches!(self, ScaleVerdict::NotLog(_))
    }

    /// Report label for the verdict.
    pub fn label(&self) -> &'static str {
        match self {
            ScaleVerdict::DeclaredLog2 => "SUPPOSEDLY LOG2 SCALED",
            ScaleVerdict::DeclaredLog10 => "SUPPOSEDLY LOG10 SCALED",
            ScaleVerdict::DeclaredLogUnknownBase => "SUPPOSEDLY LOGBASEUNKNOWN SCALED",
            ScaleVerdict::PossiblyLog(_) => "POSSIBLY LOG SCALED",
            ScaleVerdict::NotLog(_) => "NOT LOG SCALED",
        }
    }
}

impl fmt::Display for ScaleVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify the scale of `vectors`, trusting `declared` when it names a log scale.
pub fn classify(
    vectors: &[SampleVector],
    declared: Option<Scale>,
) -> Result<ScaleVerdict, ScaleError> {
    if vectors.is_empty() {
        return Err(ScaleError::EmptyInput);
    }

    match ScaleSource::from_declared(declared) {
        ScaleSource::Declared(LogScale::Log2) => Ok(ScaleVerdict::DeclaredLog2),
        ScaleSource::Declared(LogScale::Log10) => Ok(ScaleVerdict::DeclaredLog10),
        ScaleSource::Declared(LogScale::UnknownBase) => Ok(ScaleVerdict::DeclaredLogUnknownBase),
        ScaleSource::Inferred => infer(vectors),
    }
}

fn infer(vectors: &[SampleVector]) -> Result<ScaleVerdict, ScaleError> {
    let pooled = vectors.iter().flat_map(|v| v.values.iter().copied());
    let summary = Summary::compute(pooled).ok_or_else(|| ScaleError::NoValidData {
        pooled: vectors.iter().map(|v| v.values.len()).sum(),
    })?;

    let verdict = apply_rules(summary);
    match verdict.evidence().map(|e| e.rule) {
        Some(Rule::NarrowRange) => log::info!("Range is narrow, could be log scaled"),
        Some(Rule::LargeValues) => log::info!(
            "Data has large values, doesn't look log transformed: {}",
            summary.max
        ),
        Some(Rule::SmallValues) => log::info!(
            "Data has very small values, doesn't look log transformed: {}",
            summary.min
        ),
        Some(Rule::CannotRuleOut) => log::info!("Can't rule out possibility of log scale"),
        None => {}
    }
    Ok(verdict)
}

/// First matching range rule wins.
fn apply_rules(summary: Summary) -> ScaleVerdict {
    let evidence = |rule| Evidence { summary, rule };
    if summary.range() < NARROW_RANGE {
        ScaleVerdict::PossiblyLog(evidence(Rule::NarrowRange))
    } else if summary.max > LARGE_VALUE {
        ScaleVerdict::NotLog(evidence(Rule::LargeValues))
    } else if summary.min < SMALL_VALUE {
        ScaleVerdict::NotLog(evidence(Rule::SmallValues))
    } else {
        ScaleVerdict::PossiblyLog(evidence(Rule::CannotRuleOut))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{PrimitiveType, QuantitationType};
    use proptest::prelude::*;

    fn vector(values: &[f64]) -> SampleVector {
        SampleVector {
            name: "probe".to_string(),
            values: values.to_vec(),
            quantitation_type: QuantitationType::new("signal", PrimitiveType::Double),
        }
    }

    fn rule_of(verdict: ScaleVerdict) -> Rule {
        verdict.evidence().expect("inferred verdict").rule
    }

    #[test]
    fn narrow_range_is_possibly_log() {
        let verdict = classify(&[vector(&[0.5, 0.8, 1.2, 2.0, 3.5])], None).unwrap();
        assert!(matches!(verdict, ScaleVerdict::PossiblyLog(_)));
        let e = verdict.evidence().unwrap();
        assert_eq!(e.rule, Rule::NarrowRange);
        assert_eq!((e.summary.min, e.summary.median, e.summary.max), (0.5, 1.2, 3.5));
    }

    #[test]
    fn large_values_are_not_log() {
        let verdict = classify(&[vector(&[10.0, 200.0, 5000.0])], None).unwrap();
        assert!(matches!(verdict, ScaleVerdict::NotLog(_)));
        assert_eq!(rule_of(verdict), Rule::LargeValues);
    }

    #[test]
    fn small_values_with_wide_range_are_not_log() {
        let verdict = classify(&[vector(&[0.2, 15.0, 30.0])], Some(Scale::Linear)).unwrap();
        assert_eq!(rule_of(verdict), Rule::SmallValues);
        assert!(!verdict.is_log());
    }

    #[test]
    fn moderate_values_cannot_be_ruled_out() {
        let verdict = classify(&[vector(&[2.0, 8.0]), vector(&[14.0, 40.0])], None).unwrap();
        assert!(matches!(verdict, ScaleVerdict::PossiblyLog(_)));
        assert_eq!(rule_of(verdict), Rule::CannotRuleOut);
    }

    #[test]
    fn values_are_pooled_across_vectors() {
        // Each vector alone is narrow; together the range is wide.
        let verdict = classify(&[vector(&[1.0, 2.0]), vector(&[60.0, 61.0])], None).unwrap();
        assert_eq!(rule_of(verdict), Rule::LargeValues);
        assert_eq!(verdict.evidence().unwrap().summary.median, 31.0);
    }

    #[test]
    fn declared_log_scales_short_circuit() {
        let junk = [vector(&[f64::NAN, 1e9, -1e9])];
        assert_eq!(classify(&junk, Some(Scale::Log2)), Ok(ScaleVerdict::DeclaredLog2));
        assert_eq!(classify(&junk, Some(Scale::Log10)), Ok(ScaleVerdict::DeclaredLog10));
        assert_eq!(
            classify(&junk, Some(Scale::LogUnknownBase)),
            Ok(ScaleVerdict::DeclaredLogUnknownBase)
        );
        assert!(ScaleVerdict::DeclaredLog2.evidence().is_none());
    }

    #[test]
    fn declared_scale_does_not_need_valid_values() {
        let all_missing = [vector(&[f64::NAN, f64::NAN])];
        assert_eq!(
            classify(&all_missing, Some(Scale::Log2)),
            Ok(ScaleVerdict::DeclaredLog2)
        );
        assert_eq!(
            classify(&all_missing, None),
            Err(ScaleError::NoValidData { pooled: 2 })
        );
    }

    #[test]
    fn empty_input_is_an_error_even_when_declared() {
        assert_eq!(classify(&[], None), Err(ScaleError::EmptyInput));
        assert_eq!(classify(&[], Some(Scale::Log2)), Err(ScaleError::EmptyInput));
    }

    #[test]
    fn single_value_is_narrow() {
        let verdict = classify(&[vector(&[f64::NAN, 1234.0])], None).unwrap();
        assert_eq!(rule_of(verdict), Rule::NarrowRange);
    }

    #[test]
    fn infinite_values_count_as_missing() {
        let verdict = classify(&[vector(&[f64::INFINITY, 4.0])], None).unwrap();
        assert_eq!(rule_of(verdict), Rule::NarrowRange);
        assert_eq!(
            classify(&[vector(&[f64::INFINITY])], None),
            Err(ScaleError::NoValidData { pooled: 1 })
        );
    }

    #[test]
    fn source_dispatch() {
        assert_eq!(ScaleSource::from_declared(None), ScaleSource::Inferred);
        assert_eq!(ScaleSource::from_declared(Some(Scale::Linear)), ScaleSource::Inferred);
        assert_eq!(
            ScaleSource::from_declared(Some(Scale::Log10)),
            ScaleSource::Declared(LogScale::Log10)
        );
    }

    proptest! {
        #[test]
        fn narrow_range_wins_at_any_magnitude(
            offset in -1e6f64..1e6,
            spread in proptest::collection::vec(0.0f64..9.99, 1..30),
        ) {
            let values: Vec<f64> = spread.iter().map(|s| offset + s).collect();
            let verdict = classify(&[vector(&values)], None).unwrap();
            prop_assert!(matches!(verdict, ScaleVerdict::PossiblyLog(_)));
        }

        #[test]
        fn wide_range_above_fifty_is_not_log(
            min in -1e3f64..40.0,
            extra in 10.0f64..1e4,
        ) {
            let max = (min + extra).max(50.5);
            let verdict = classify(&[vector(&[min, max])], None).unwrap();
            prop_assert!(matches!(verdict, ScaleVerdict::NotLog(_)));
        }

        #[test]
        fn wide_range_below_one_is_not_log(
            min in -100.0f64..0.999,
            max in 40.0f64..=50.0,
        ) {
            let verdict = classify(&[vector(&[min, max])], None).unwrap();
            prop_assert_eq!(rule_of(verdict), Rule::SmallValues);
        }

        #[test]
        fn declared_log2_ignores_values(values in proptest::collection::vec(any::<f64>(), 0..10)) {
            let verdict = classify(&[vector(&values)], Some(Scale::Log2)).unwrap();
            prop_assert_eq!(verdict, ScaleVerdict::DeclaredLog2);
        }
    }
}
