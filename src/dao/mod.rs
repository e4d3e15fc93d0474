/// Store abstractions and backends.
pub mod hunt_store;
/// Persisted record definitions.
pub mod models;
/// Puzzle record repository.
pub mod puzzle;
/// Settings repository with its read-through cache.
pub mod settings;
/// Storage abstraction layer shared by backends.
pub mod storage;
/// Invariant validation applied at commit time.
pub mod validation;
