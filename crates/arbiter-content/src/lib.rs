//! Arbiter: content ingestion.
//!
//! Responsible for parsing YAML or JSON content packs into typed action,
//! effect and resource templates, skipping malformed units, hashing the
//! source for versioning and checking template references.

pub mod application;
pub mod domain;
