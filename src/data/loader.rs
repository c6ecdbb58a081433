use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, LargeListArray, ListArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{
    EncodedVector, ExperimentRef, PrimitiveType, QuantitationType, SampleVector, Scale,
};
use crate::error::StoreError;
use crate::source::{MemoryVectorStore, SampleTable};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load processed sample vectors from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one row per vector, `values` as a List<Float64> column
/// * `.json`    – `[{ "experiment": {...}, "quantitation_type": {...}, "vectors": [...] }, ...]`
/// * `.csv`     – one row per vector, `values` semicolon-separated
///
/// Missing values (null items, empty / `NA` / `NaN` tokens) become `NaN`.
pub fn load_samples(path: &Path) -> Result<SampleTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        "csv" => load_csv(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };
    log::info!("Loaded {} experiments from {}", table.len(), path.display());
    Ok(table)
}

/// Load encoded vectors from a JSON array of vector records.
pub fn load_vectors(path: &Path) -> Result<MemoryVectorStore> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let vectors: Vec<EncodedVector> =
        serde_json::from_reader(BufReader::new(file)).context("parsing vector JSON")?;
    log::info!("Loaded {} vectors from {}", vectors.len(), path.display());
    Ok(MemoryVectorStore::new(vectors))
}

/// Save encoded vectors as a JSON array, replacing `path`.
pub fn save_vectors(path: &Path, vectors: &[EncodedVector]) -> Result<(), StoreError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, vectors)?;
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared row handling
// ---------------------------------------------------------------------------

/// One vector's worth of sample-file columns.
struct SampleRow {
    experiment: ExperimentRef,
    quantitation_type: String,
    description: Option<String>,
    scale: Option<String>,
    name: Option<String>,
    values: Vec<f64>,
}

fn push_row(table: &mut SampleTable, row: SampleRow, row_no: usize) {
    let scale = row.scale.as_deref().and_then(|s| parse_scale(s, row_no));
    let mut qt =
        QuantitationType::new(row.quantitation_type, PrimitiveType::Double).with_scale(scale);
    qt.description = row.description.unwrap_or_default();

    let vector = SampleVector {
        name: row.name.unwrap_or_else(|| format!("row{row_no}")),
        values: row.values,
        quantitation_type: qt,
    };
    table.push(row.experiment, vector);
}

fn parse_scale(s: &str, row_no: usize) -> Option<Scale> {
    if s.trim().is_empty() {
        return None;
    }
    let scale = Scale::parse(s);
    if scale.is_none() {
        log::warn!("Row {row_no}: unrecognised scale '{s}', treating as unspecified");
    }
    scale
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema:
///
/// ```json
/// [
///   {
///     "experiment": { "id": 12, "short_name": "GSE12" },
///     "quantitation_type": { "name": "MAS5", "scale": "LINEAR" },
///     "vectors": [
///       { "name": "1007_s_at", "values": [812.0, null, 640.5] },
///       ...
///     ]
///   },
///   ...
/// ]
/// ```
#[derive(Deserialize)]
struct JsonExperiment {
    experiment: ExperimentRef,
    quantitation_type: QuantitationType,
    #[serde(default)]
    vectors: Vec<JsonVector>,
}

#[derive(Deserialize)]
struct JsonVector {
    #[serde(default)]
    name: String,
    values: Vec<Option<f64>>,
}

fn load_json(path: &Path) -> Result<SampleTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let records: Vec<JsonExperiment> = serde_json::from_str(&text).context("parsing JSON")?;

    let mut table = SampleTable::new();
    for rec in records {
        table.insert_experiment(rec.experiment.clone());
        for v in rec.vectors {
            let values = v.values.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect();
            let vector = SampleVector {
                name: v.name,
                values,
                quantitation_type: rec.quantitation_type.clone(),
            };
            table.push(rec.experiment.clone(), vector);
        }
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names.
/// Required: `experiment_id`, `experiment_name`, `quantitation_type`, `values`.
/// Optional: `description`, `scale`, `name`.
/// `values` holds semicolon-separated floats: `"7.2;NA;8.9"`.
fn load_csv(path: &Path) -> Result<SampleTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let required = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("CSV missing '{name}' column"))
    };
    let optional = |name: &str| headers.iter().position(|h| h == name);

    let id_idx = required("experiment_id")?;
    let ee_idx = required("experiment_name")?;
    let qt_idx = required("quantitation_type")?;
    let values_idx = required("values")?;
    let desc_idx = optional("description");
    let scale_idx = optional("scale");
    let name_idx = optional("name");

    let mut table = SampleTable::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let opt_field = |idx: Option<usize>| idx.map(|i| field(i).to_string());

        let id = field(id_idx).trim().parse::<i64>().with_context(|| {
            format!(
                "Row {row_no}: experiment_id '{}' is not an integer",
                field(id_idx)
            )
        })?;

        let row = SampleRow {
            experiment: ExperimentRef::new(id, field(ee_idx)),
            quantitation_type: field(qt_idx).to_string(),
            description: opt_field(desc_idx),
            scale: opt_field(scale_idx),
            name: opt_field(name_idx).filter(|n| !n.is_empty()),
            values: parse_semicolon_floats(field(values_idx), row_no)?,
        };
        push_row(&mut table, row, row_no);
    }

    Ok(table)
}

fn parse_semicolon_floats(s: &str, row: usize) -> Result<Vec<f64>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            let tok = tok.trim();
            if tok.is_empty() || tok.eq_ignore_ascii_case("na") || tok.eq_ignore_ascii_case("nan") {
                return Ok(f64::NAN);
            }
            tok.parse::<f64>()
                .with_context(|| format!("Row {row}, values[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of processed vectors.
///
/// Expected schema:
/// - `experiment_id`: Int64 or Int32
/// - `experiment_name`, `quantitation_type`: Utf8
/// - `description`, `scale`, `name`: Utf8, optional columns, nullable
/// - `values`: List<Float64> or LargeList<Float64>; null items are missing values
fn load_parquet(path: &Path) -> Result<SampleTable> {
    let file = File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut table = SampleTable::new();
    let mut row_no = 0usize;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let column = |name: &str| {
            schema
                .index_of(name)
                .map(|i| batch.column(i))
                .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))
        };
        let optional = |name: &str| schema.index_of(name).ok().map(|i| batch.column(i));

        let id_col = column("experiment_id")?;
        let ee_col = column("experiment_name")?;
        let qt_col = column("quantitation_type")?;
        let values_col = column("values")?;
        let desc_col = optional("description");
        let scale_col = optional("scale");
        let name_col = optional("name");

        for row in 0..batch.num_rows() {
            let text = |col: &Arc<dyn Array>, what: &str| {
                extract_string(col, row)
                    .with_context(|| format!("Row {row_no}: failed to read '{what}'"))
            };
            let opt_text = |col: Option<&Arc<dyn Array>>, what: &str| match col {
                Some(c) => text(c, what),
                None => Ok(None),
            };

            let id = extract_i64(id_col, row)
                .with_context(|| format!("Row {row_no}: failed to read 'experiment_id'"))?;
            let ee_name = text(ee_col, "experiment_name")?.unwrap_or_default();
            let qt_name = text(qt_col, "quantitation_type")?
                .with_context(|| format!("Row {row_no}: null quantitation_type"))?;
            let values = extract_f64_list(values_col, row)
                .with_context(|| format!("Row {row_no}: failed to read 'values'"))?;

            let sample_row = SampleRow {
                experiment: ExperimentRef::new(id, ee_name),
                quantitation_type: qt_name,
                description: opt_text(desc_col, "description")?,
                scale: opt_text(scale_col, "scale")?,
                name: opt_text(name_col, "name")?,
                values,
            };
            push_row(&mut table, sample_row, row_no);
            row_no += 1;
        }
    }

    Ok(table)
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Read a nullable Utf8 / LargeUtf8 cell.
fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<Option<String>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let s = match col.data_type() {
        DataType::Utf8 => col.as_string::<i32>().value(row),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row),
        other => bail!("Expected Utf8 column, got {other:?}"),
    };
    Ok(Some(s.to_string()))
}

fn extract_i64(col: &Arc<dyn Array>, row: usize) -> Result<i64> {
    if col.is_null(row) {
        bail!("null experiment id");
    }
    match col.data_type() {
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().context("expected Int64Array")?;
            Ok(arr.value(row))
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().context("expected Int32Array")?;
            Ok(i64::from(arr.value(row)))
        }
        other => bail!("Expected Int64 or Int32 column, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::codec;
    use crate::source::{SampleSource, VectorStore};
    use arrow::array::{Float64Builder, ListBuilder, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    fn all_vectors(table: &SampleTable) -> Vec<SampleVector> {
        table
            .experiments()
            .iter()
            .flat_map(|ee| {
                table
                    .quantitation_types(ee)
                    .unwrap()
                    .iter()
                    .flat_map(|qt| table.sample_vectors(ee, qt, usize::MAX).unwrap())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn json_samples_with_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.json");
        std::fs::write(
            &path,
            r#"[
              {"experiment": {"id": 3, "short_name": "GSE3"},
               "quantitation_type": {"name": "RMA", "scale": "LOG2"},
               "vectors": [{"name": "p1", "values": [7.1, null, 8.0]}]},
              {"experiment": {"id": 4, "short_name": "GSE4"},
               "quantitation_type": {"name": "MAS5"}}
            ]"#,
        )
        .unwrap();

        let table = load_samples(&path).unwrap();
        assert_eq!(table.len(), 2);

        let vectors = all_vectors(&table);
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].quantitation_type.scale, Some(Scale::Log2));
        assert!(vectors[0].values[1].is_nan());
    }

    #[test]
    fn csv_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.csv");
        std::fs::write(
            &path,
            "experiment_id,experiment_name,quantitation_type,scale,values\n\
             1,GSE1,MAS5,LINEAR,10;200;NA\n\
             1,GSE1,MAS5,LINEAR,5000;;3\n\
             2,GSE2,RMA,bogus,7.5;8.1\n",
        )
        .unwrap();

        let table = load_samples(&path).unwrap();
        assert_eq!(table.len(), 2);

        let vectors = all_vectors(&table);
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0].name, "row0");
        assert!(vectors[0].values[2].is_nan());
        assert!(vectors[1].values[1].is_nan());
        assert_eq!(vectors[0].quantitation_type.scale, Some(Scale::Linear));
        assert_eq!(vectors[2].quantitation_type.scale, None);
    }

    #[test]
    fn csv_rows_of_one_experiment_keep_their_quantitation_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two_types.csv");
        std::fs::write(
            &path,
            "experiment_id,experiment_name,quantitation_type,scale,values\n\
             1,GSE1,RMA,LINEAR,7;8\n\
             1,GSE1,MAS5,LOG2,5000;9000\n\
             1,GSE1,RMA,LINEAR,7.5\n",
        )
        .unwrap();

        let table = load_samples(&path).unwrap();
        let ee = ExperimentRef::new(1, "GSE1");
        let qts = table.quantitation_types(&ee).unwrap();
        assert_eq!(qts.len(), 2);
        assert_eq!((qts[0].name.as_str(), qts[0].scale), ("RMA", Some(Scale::Linear)));
        assert_eq!((qts[1].name.as_str(), qts[1].scale), ("MAS5", Some(Scale::Log2)));
        assert_eq!(table.sample_vectors(&ee, &qts[0], 10).unwrap().len(), 2);
    }

    #[test]
    fn csv_rejects_bad_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(
            &path,
            "experiment_id,experiment_name,quantitation_type,values\n1,GSE1,MAS5,1;x\n",
        )
        .unwrap();
        let err = load_samples(&path).unwrap_err();
        assert!(format!("{err:#}").contains("'x' is not a number"));
    }

    #[test]
    fn unsupported_extension() {
        let err = load_samples(Path::new("samples.xlsx")).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }

    #[test]
    fn parquet_samples_with_null_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.parquet");

        let mut values = ListBuilder::new(Float64Builder::new());
        values.values().append_value(1.0);
        values.values().append_null();
        values.values().append_value(3.0);
        values.append(true);
        values.values().append_value(9.0);
        values.append(true);

        let schema = Arc::new(Schema::new(vec![
            Field::new("experiment_id", DataType::Int64, false),
            Field::new("experiment_name", DataType::Utf8, false),
            Field::new("quantitation_type", DataType::Utf8, false),
            Field::new("scale", DataType::Utf8, true),
            Field::new(
                "values",
                DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
                false,
            ),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![8, 9])),
                Arc::new(StringArray::from(vec!["GSE8", "GSE9"])),
                Arc::new(StringArray::from(vec!["RMA", "MAS5"])),
                Arc::new(StringArray::from(vec![Some("LOG2"), None])),
                Arc::new(values.finish()),
            ],
        )
        .unwrap();
        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_samples(&path).unwrap();
        let vectors = all_vectors(&table);
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].values.len(), 3);
        assert!(vectors[0].values[1].is_nan());
        assert_eq!(vectors[0].quantitation_type.scale, Some(Scale::Log2));
        assert_eq!(vectors[1].quantitation_type.scale, None);
        assert_eq!(vectors[1].values, vec![9.0]);
    }

    #[test]
    fn vectors_survive_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.json");
        let vector = EncodedVector {
            id: 5,
            experiment: ExperimentRef::new(1, "GSE1"),
            quantitation_type: QuantitationType::new("Call", PrimitiveType::String),
            expected_count: 2,
            data: codec::encode_strings(&["P", "\t"]).unwrap(),
        };
        save_vectors(&path, std::slice::from_ref(&vector)).unwrap();

        let store = load_vectors(&path).unwrap();
        assert_eq!(store.all(), &[vector]);
        assert_eq!(store.quantitation_types().unwrap().len(), 1);
    }
}
