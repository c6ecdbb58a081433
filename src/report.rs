//! Tab-separated scale report, one record per experiment and quantitation type.
//!
//! ```text
//! State                      EEID  EENAME  QT      DESC  MIN   MED   MAX
//! SUPPOSEDLY LOG2 SCALED     12    GSE12
//! NOT LOG SCALED             15    GSE15   MAS5    ...   0.10  80.25 5120.00
//! ```

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::data::model::{ExperimentRef, QuantitationType};
use crate::error::DiagError;
use crate::scale::ScaleVerdict;

pub const HEADER: [&str; 8] = ["State", "EEID", "EENAME", "QT", "DESC", "MIN", "MED", "MAX"];

pub struct ScaleReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl ScaleReportWriter<File> {
    /// Create (or replace) the report file at `path`.
    pub fn create(path: &Path) -> Result<Self, DiagError> {
        let file = File::create(path)?;
        log::info!("New file: {}", path.display());
        Self::new(file)
    }
}

impl<W: Write> ScaleReportWriter<W> {
    /// Wrap `inner` and write the header row.
    pub fn new(inner: W) -> Result<Self, DiagError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .flexible(true)
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(HEADER)?;
        Ok(Self { writer })
    }

    /// Write one verdict. Declared verdicts carry no statistics and so only
    /// fill the first three columns.
    pub fn write(
        &mut self,
        experiment: &ExperimentRef,
        quantitation_type: &QuantitationType,
        verdict: &ScaleVerdict,
    ) -> Result<(), DiagError> {
        let mut record = vec![
            verdict.label().to_string(),
            experiment.id.to_string(),
            clean(&experiment.short_name),
        ];
        if let Some(e) = verdict.evidence() {
            record.push(clean(&quantitation_type.name));
            record.push(clean(&quantitation_type.description));
            record.push(format!("{:.2}", e.summary.min));
            record.push(format!("{:.2}", e.summary.median));
            record.push(format!("{:.2}", e.summary.max));
        }
        self.writer.write_record(&record)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), DiagError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W, DiagError> {
        self.writer
            .into_inner()
            .map_err(|e| DiagError::Io(e.into_error()))
    }
}

/// Fields are unquoted, so tabs and newlines inside free text become spaces.
fn clean(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}
