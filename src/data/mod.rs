/// Data layer: core types, parsing, and input discovery.
///
/// Architecture:
/// ```text
///  instrument .txt
///        │
///        ▼
///   ┌──────────┐
///   │  parser   │  table section + "sample information" metadata
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ RawData   │  Table (columns × rows), metadata map, source path
///   └──────────┘
/// ```

pub mod discovery;
pub mod model;
pub mod parser;
