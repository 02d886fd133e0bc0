//! # Ingestion
//!
//! The log deduplicator & ingestor: turns raw punch events into canonical,
//! employee-resolved log entries and feeds each one to the attendance
//! merger. Near-duplicates are rejected, unresolved employees are skipped,
//! and per-event failures never abort the batch.

mod ingestor;

pub use contracts::BatchStats;
pub use ingestor::LogIngestor;
