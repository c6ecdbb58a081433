//! Boundaries to the data platform.
//!
//! The drivers only see these traits. The in-memory implementations back
//! the file loaders and the tests.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::data::model::{EncodedVector, ExperimentRef, QuantitationType, SampleVector};
use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Supplies processed sample vectors per experiment and quantitation type.
pub trait SampleSource {
    fn experiments(&self) -> Vec<ExperimentRef>;

    /// Quantitation types with sample vectors in `experiment`.
    fn quantitation_types(
        &self,
        experiment: &ExperimentRef,
    ) -> Result<Vec<QuantitationType>, StoreError>;

    /// At most `limit` vectors of one quantitation type, in stored order.
    fn sample_vectors(
        &self,
        experiment: &ExperimentRef,
        quantitation_type: &QuantitationType,
        limit: usize,
    ) -> Result<Vec<SampleVector>, StoreError>;
}

/// Supplies encoded vectors grouped by quantitation type and accepts
/// repaired payloads.
pub trait VectorStore {
    fn quantitation_types(&self) -> Result<Vec<QuantitationType>, StoreError>;

    fn vectors(
        &self,
        quantitation_type: &QuantitationType,
    ) -> Result<Vec<EncodedVector>, StoreError>;

    /// Persist the payloads of `vectors`, replacing what is stored.
    fn write_back(&mut self, vectors: &[EncodedVector]) -> Result<(), StoreError>;
}

/// Quantitation types are told apart by id and name; loaders that have no
/// ids leave every id at 0.
fn same_type(a: &QuantitationType, b: &QuantitationType) -> bool {
    a.id == b.id && a.name == b.name
}

// ---------------------------------------------------------------------------
// In-memory sample source
// ---------------------------------------------------------------------------

/// Sample vectors of one quantitation type.
#[derive(Debug, Clone)]
pub struct TypeSamples {
    pub quantitation_type: QuantitationType,
    pub vectors: Vec<SampleVector>,
}

/// Sample vectors of one experiment, grouped by quantitation type in
/// first-seen order.
#[derive(Debug, Clone)]
pub struct ExperimentSamples {
    pub experiment: ExperimentRef,
    pub types: Vec<TypeSamples>,
}

impl ExperimentSamples {
    fn new(experiment: ExperimentRef) -> Self {
        Self {
            experiment,
            types: Vec::new(),
        }
    }

    fn group(&self, quantitation_type: &QuantitationType) -> Option<&TypeSamples> {
        self.types
            .iter()
            .find(|t| same_type(&t.quantitation_type, quantitation_type))
    }
}

/// Experiments keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    experiments: BTreeMap<i64, ExperimentSamples>,
}

impl SampleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `vector` to its experiment and quantitation type, creating
    /// either on first sight.
    pub fn push(&mut self, experiment: ExperimentRef, vector: SampleVector) {
        let samples = self
            .experiments
            .entry(experiment.id)
            .or_insert_with(|| ExperimentSamples::new(experiment));

        let qt = &vector.quantitation_type;
        match samples
            .types
            .iter_mut()
            .find(|t| same_type(&t.quantitation_type, qt))
        {
            Some(group) => group.vectors.push(vector),
            None => samples.types.push(TypeSamples {
                quantitation_type: qt.clone(),
                vectors: vec![vector],
            }),
        }
    }

    /// Register an experiment even if it has no vectors.
    pub fn insert_experiment(&mut self, experiment: ExperimentRef) {
        self.experiments
            .entry(experiment.id)
            .or_insert_with(|| ExperimentSamples::new(experiment));
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    fn get(&self, experiment: &ExperimentRef) -> Result<&ExperimentSamples, StoreError> {
        self.experiments
            .get(&experiment.id)
            .ok_or_else(|| StoreError::Backend(format!("unknown experiment {experiment}")))
    }
}

impl SampleSource for SampleTable {
    fn experiments(&self) -> Vec<ExperimentRef> {
        self.experiments
            .values()
            .map(|e| e.experiment.clone())
            .collect()
    }

    fn quantitation_types(
        &self,
        experiment: &ExperimentRef,
    ) -> Result<Vec<QuantitationType>, StoreError> {
        Ok(self
            .get(experiment)?
            .types
            .iter()
            .map(|t| t.quantitation_type.clone())
            .collect())
    }

    fn sample_vectors(
        &self,
        experiment: &ExperimentRef,
        quantitation_type: &QuantitationType,
        limit: usize,
    ) -> Result<Vec<SampleVector>, StoreError> {
        let vectors = self
            .get(experiment)?
            .group(quantitation_type)
            .map(|t| t.vectors.iter().take(limit).cloned().collect())
            .unwrap_or_default();
        Ok(vectors)
    }
}

// ---------------------------------------------------------------------------
// In-memory vector store
// ---------------------------------------------------------------------------

/// Encoded vectors held in memory, in load order.
#[derive(Debug, Clone, Default)]
pub struct MemoryVectorStore {
    vectors: Vec<EncodedVector>,
    /// Position of each vector id; the first occurrence wins.
    positions: HashMap<i64, usize>,
    /// Number of vectors replaced by write-backs so far.
    pub written: usize,
}

impl MemoryVectorStore {
    pub fn new(vectors: Vec<EncodedVector>) -> Self {
        let mut positions = HashMap::with_capacity(vectors.len());
        for (i, v) in vectors.iter().enumerate() {
            match positions.entry(v.id) {
                Entry::Vacant(slot) => {
                    slot.insert(i);
                }
                Entry::Occupied(_) => log::warn!("Duplicate vector id {}", v.id),
            }
        }
        Self {
            vectors,
            positions,
            written: 0,
        }
    }

    pub fn all(&self) -> &[EncodedVector] {
        &self.vectors
    }

    pub fn get(&self, id: i64) -> Option<&EncodedVector> {
        self.positions.get(&id).map(|&i| &self.vectors[i])
    }

    pub fn into_vectors(self) -> Vec<EncodedVector> {
        self.vectors
    }
}

impl VectorStore for MemoryVectorStore {
    fn quantitation_types(&self) -> Result<Vec<QuantitationType>, StoreError> {
        let mut seen: BTreeMap<(i64, &str), &QuantitationType> = BTreeMap::new();
        for v in &self.vectors {
            let qt = &v.quantitation_type;
            seen.entry((qt.id, qt.name.as_str())).or_insert(qt);
        }
        Ok(seen.into_values().cloned().collect())
    }

    fn vectors(
        &self,
        quantitation_type: &QuantitationType,
    ) -> Result<Vec<EncodedVector>, StoreError> {
        Ok(self
            .vectors
            .iter()
            .filter(|v| same_type(&v.quantitation_type, quantitation_type))
            .cloned()
            .collect())
    }

    fn write_back(&mut self, vectors: &[EncodedVector]) -> Result<(), StoreError> {
        for updated in vectors {
            let &i = self
                .positions
                .get(&updated.id)
                .ok_or(StoreError::UnknownVector(updated.id))?;
            self.vectors[i].data = updated.data.clone();
            self.written += 1;
        }
        Ok(())
    }
}
