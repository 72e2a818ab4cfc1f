/// Data layer: event table types, loading, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → EventTable
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ EventTable  │  ordered columns, rows of Value, event ids
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply named constraints → narrowed EventTable
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod filter;
