//! Integration tests for Sluice
//!
//! These tests drive the public API end to end: resolving byte sources
//! against the built-in registry, then reading packets until end of stream
//! or failure.

#[path = "integration/file_sources.rs"]
mod file_sources;
#[path = "integration/multi_stream.rs"]
mod multi_stream;
#[path = "integration/resolution.rs"]
mod resolution;
#[path = "integration/stream_invariants.rs"]
mod stream_invariants;
#[path = "integration/truncation.rs"]
mod truncation;
