use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Builder, Int64Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use gemma_diag::data::codec;
use gemma_diag::data::loader::save_vectors;
use gemma_diag::data::model::{
    Element, EncodedVector, ExperimentRef, PrimitiveType, QuantitationType,
};

const SAMPLES_PER_VECTOR: usize = 6;
const VECTORS_PER_EXPERIMENT: usize = 20;
const MISSING_RATE: f64 = 0.05;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// How an experiment's intensities are distributed.
#[derive(Clone, Copy)]
enum Profile {
    /// Already log2: roughly N(8, 1.5).
    Log2,
    /// Raw intensities: log-normal, into the thousands.
    Raw,
    /// Ratios: log-normal around 1, mostly below 30.
    Ratio,
}

impl Profile {
    fn draw(self, rng: &mut SimpleRng) -> f64 {
        match self {
            Profile::Log2 => rng.gauss(8.0, 1.5),
            Profile::Raw => rng.gauss(6.0, 1.5).exp(),
            Profile::Ratio => rng.gauss(0.0, 1.0).exp().min(30.0),
        }
    }
}

fn write_samples(rng: &mut SimpleRng, path: &str) -> Result<usize> {
    // (id, short name, quantitation type, declared scale, profile)
    let experiments = [
        (1001_i64, "GSE1001", "RMA", Some("LOG2"), Profile::Log2),
        (1002, "GSE1002", "MAS5", Some("LINEAR"), Profile::Raw),
        (1003, "GSE1003", "Processed signal", None, Profile::Log2),
        (1004, "GSE1004", "Ratio", None, Profile::Ratio),
    ];

    let mut ids = Vec::new();
    let mut names = Vec::new();
    let mut qts = Vec::new();
    let mut scales = Vec::new();
    let mut probes = Vec::new();
    let mut values = ListBuilder::new(Float64Builder::new());

    for &(id, short_name, qt, scale, profile) in &experiments {
        for probe in 0..VECTORS_PER_EXPERIMENT {
            ids.push(id);
            names.push(short_name);
            qts.push(qt);
            scales.push(scale);
            probes.push(format!("probe_{probe}"));

            let row = values.values();
            for _ in 0..SAMPLES_PER_VECTOR {
                if rng.next_f64() < MISSING_RATE {
                    row.append_null();
                } else {
                    row.append_value(profile.draw(rng));
                }
            }
            values.append(true);
        }
    }
    let rows = ids.len();

    let schema = Arc::new(Schema::new(vec![
        Field::new("experiment_id", DataType::Int64, false),
        Field::new("experiment_name", DataType::Utf8, false),
        Field::new("quantitation_type", DataType::Utf8, false),
        Field::new("scale", DataType::Utf8, true),
        Field::new("name", DataType::Utf8, false),
        Field::new(
            "values",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(names)),
            Arc::new(StringArray::from(qts)),
            Arc::new(StringArray::from(scales)),
            Arc::new(StringArray::from(
                probes.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            )),
            Arc::new(values.finish()),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating sample parquet")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(rows)
}

fn write_vectors(rng: &mut SimpleRng, path: &str) -> Result<usize> {
    let experiment = ExperimentRef::new(1001, "GSE1001");
    let mut call = QuantitationType::new("Detection call", PrimitiveType::String);
    call.id = 1;
    let mut signal = QuantitationType::new("RMA", PrimitiveType::Double);
    signal.id = 2;
    let mut counts = QuantitationType::new("Read count", PrimitiveType::Int);
    counts.id = 3;

    let vector = |id: i64, qt: &QuantitationType, data: Vec<u8>| EncodedVector {
        id,
        experiment: experiment.clone(),
        quantitation_type: qt.clone(),
        expected_count: SAMPLES_PER_VECTOR,
        data,
    };

    let calls = ["P", "P", "A", "M", "P", "A"];
    let with_tab = ["P", "\t", "P", "A", "M", "P", "A"];
    let short_with_tab = ["P", "\t", "P", "A", "M", "P"];

    let doubles: Vec<f64> = (0..SAMPLES_PER_VECTOR).map(|_| rng.gauss(8.0, 1.5)).collect();
    let ints: Vec<Element> = (0..SAMPLES_PER_VECTOR)
        .map(|_| Element::Int((rng.next_f64() * 500.0) as i32))
        .collect();

    let vectors = vec![
        vector(1, &call, codec::encode_strings(&calls)?),
        vector(2, &call, codec::encode_strings(&with_tab)?),
        vector(3, &call, codec::encode_strings(&short_with_tab)?),
        vector(4, &signal, codec::encode_doubles(&doubles)),
        vector(5, &signal, codec::encode_doubles(&doubles[1..])),
        vector(6, &counts, codec::encode(&ints, PrimitiveType::Int)?),
    ];

    save_vectors(std::path::Path::new(path), &vectors).context("writing vector JSON")?;
    Ok(vectors.len())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let samples_path = "sample_data.parquet";
    let rows = write_samples(&mut rng, samples_path)?;
    println!("Wrote {rows} sample vectors ({SAMPLES_PER_VECTOR} samples each) to {samples_path}");

    let vectors_path = "sample_vectors.json";
    let n = write_vectors(&mut rng, vectors_path)?;
    println!("Wrote {n} encoded vectors to {vectors_path}");

    let run_path = "gemma-diag.json";
    let run = serde_json::json!({
        "samples": samples_path,
        "vectors": vectors_path,
        "vectors_out": "sample_vectors.fixed.json",
        "mode": "full",
    });
    std::fs::write(run_path, serde_json::to_string_pretty(&run)?).context("writing run file")?;
    println!("Wrote run file {run_path}; try `gemma-diag {run_path}`");

    Ok(())
}
