/// Data layer: core types, byte codec, and file loading.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv          vectors .json
///        │                                │
///        ▼                                ▼
///   ┌──────────┐                    ┌──────────┐
///   │  loader   │ → SampleTable      │  loader   │ → MemoryVectorStore
///   └──────────┘                    └──────────┘
///        │                                │
///        ▼                                ▼
///   SampleVector (f64, NaN = missing)  EncodedVector (bytes)
///                                         │
///                                         ▼
///                                   ┌──────────┐
///                                   │  codec    │  bytes ⇄ Element / String
///                                   └──────────┘
/// ```

pub mod codec;
pub mod loader;
pub mod model;
