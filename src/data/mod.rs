/// Data layer: vocabulary, description, source, pruning and output.
///
/// Architecture:
/// ```text
///  dataset_descriptions.json        parquet shards (local dir / Hub)
///        │                                  │
///        ▼                                  ▼
///   ┌─────────────┐                   ┌──────────┐
///   │ description │  validated caps   │  loader  │  lazy RecordRef stream
///   └─────────────┘  + class list     └──────────┘  per split
///        │                                  │
///        └──────────────┬───────────────────┘
///                       ▼
///                 ┌──────────┐
///                 │  prune   │  shuffle → allow-list → cap
///                 └──────────┘
///                       │
///                       ▼
///                 ┌──────────┐
///                 │  writer  │  {split}.parquet
///                 └──────────┘
/// ```

pub mod description;
pub mod loader;
pub mod model;
pub mod prune;
pub mod vocabulary;
pub mod writer;
