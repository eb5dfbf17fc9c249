/// Data layer: table model, loading, writing, and the predicate pass.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  ordered columns, Vec<Vec<Value>>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply criteria → retained rows or mask
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  Dataset + TableMeta → file
///   └──────────┘
/// ```
pub mod filter;
pub mod loader;
pub mod model;
pub mod writer;
