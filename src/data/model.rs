use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Scale – the declared transform of a quantitation type
// ---------------------------------------------------------------------------

/// Declared numeric scale of a quantitation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scale {
    #[serde(rename = "LOG2")]
    Log2,
    #[serde(rename = "LOG10")]
    Log10,
    #[serde(rename = "LOG_UNKNOWN_BASE", alias = "LOGBASEUNKNOWN")]
    LogUnknownBase,
    #[serde(rename = "LINEAR")]
    Linear,
}

impl Scale {
    /// Parse a scale name as stored in sample files. Case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOG2" => Some(Scale::Log2),
            "LOG10" => Some(Scale::Log10),
            "LOG_UNKNOWN_BASE" | "LOGBASEUNKNOWN" => Some(Scale::LogUnknownBase),
            "LINEAR" => Some(Scale::Linear),
            _ => None,
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scale::Log2 => "LOG2",
            Scale::Log10 => "LOG10",
            Scale::LogUnknownBase => "LOG_UNKNOWN_BASE",
            Scale::Linear => "LINEAR",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// PrimitiveType – how a vector's elements are represented on disk
// ---------------------------------------------------------------------------

/// Declared primitive representation of an encoded vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrimitiveType {
    String,
    #[default]
    Double,
    Float,
    Int,
    Long,
    Boolean,
    Char,
}

impl PrimitiveType {
    /// Whether elements are length-prefixed text.
    pub fn is_textual(self) -> bool {
        self == PrimitiveType::String
    }

    /// Encoded width in bytes of one element, `None` for variable-width text.
    pub fn width(self) -> Option<usize> {
        match self {
            PrimitiveType::String => None,
            PrimitiveType::Double | PrimitiveType::Long => Some(8),
            PrimitiveType::Float | PrimitiveType::Int => Some(4),
            PrimitiveType::Char => Some(2),
            PrimitiveType::Boolean => Some(1),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveType::String => "STRING",
            PrimitiveType::Double => "DOUBLE",
            PrimitiveType::Float => "FLOAT",
            PrimitiveType::Int => "INT",
            PrimitiveType::Long => "LONG",
            PrimitiveType::Boolean => "BOOLEAN",
            PrimitiveType::Char => "CHAR",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// QuantitationType – read-only metadata shared by many vectors
// ---------------------------------------------------------------------------

/// How a vector's values were produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitationType {
    /// Store identifier. Sample files without one get 0.
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Declared scale; `None` when unspecified.
    #[serde(default)]
    pub scale: Option<Scale>,
    #[serde(default)]
    pub representation: PrimitiveType,
}

impl QuantitationType {
    pub fn new(name: impl Into<String>, representation: PrimitiveType) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: String::new(),
            scale: None,
            representation,
        }
    }

    pub fn with_scale(mut self, scale: Option<Scale>) -> Self {
        self.scale = scale;
        self
    }
}

impl fmt::Display for QuantitationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id={}, {})", self.name, self.id, self.representation)
    }
}

// ---------------------------------------------------------------------------
// ExperimentRef – identity of the owning experiment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperimentRef {
    pub id: i64,
    pub short_name: String,
}

impl ExperimentRef {
    pub fn new(id: i64, short_name: impl Into<String>) -> Self {
        Self {
            id,
            short_name: short_name.into(),
        }
    }
}

impl fmt::Display for ExperimentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id={})", self.short_name, self.id)
    }
}

// ---------------------------------------------------------------------------
// SampleVector – one row of processed numeric data
// ---------------------------------------------------------------------------

/// One value per biological sample. Missing values are `NaN`.
#[derive(Debug, Clone)]
pub struct SampleVector {
    /// Design element (probe) the row belongs to.
    pub name: String,
    pub values: Vec<f64>,
    pub quantitation_type: QuantitationType,
}

// ---------------------------------------------------------------------------
// EncodedVector – a stored vector with its byte payload
// ---------------------------------------------------------------------------

/// A measurement vector serialized to bytes, as kept by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedVector {
    pub id: i64,
    pub experiment: ExperimentRef,
    pub quantitation_type: QuantitationType,
    /// Number of samples in the vector's bio-assay dimension.
    pub expected_count: usize,
    pub data: Vec<u8>,
}

impl EncodedVector {
    pub fn representation(&self) -> PrimitiveType {
        self.quantitation_type.representation
    }
}

// ---------------------------------------------------------------------------
// Element – a single decoded value
// ---------------------------------------------------------------------------

/// A decoded vector element, typed by the vector's representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text(String),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Bool(bool),
    Char(char),
}

impl Element {
    /// The representation this element belongs to.
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Element::Text(_) => PrimitiveType::String,
            Element::Double(_) => PrimitiveType::Double,
            Element::Float(_) => PrimitiveType::Float,
            Element::Int(_) => PrimitiveType::Int,
            Element::Long(_) => PrimitiveType::Long,
            Element::Bool(_) => PrimitiveType::Boolean,
            Element::Char(_) => PrimitiveType::Char,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Text(s) => write!(f, "{s}"),
            Element::Double(v) => write!(f, "{v}"),
            Element::Float(v) => write!(f, "{v}"),
            Element::Int(i) => write!(f, "{i}"),
            Element::Long(i) => write!(f, "{i}"),
            Element::Bool(b) => write!(f, "{b}"),
            Element::Char(c) => write!(f, "{c}"),
        }
    }
}
