//! Typed errors for the graph construction engine.
//!
//! Library-level code returns [`BuildError`]; the CLI binary wraps it in
//! `anyhow::Result` at the process boundary, matching the convention used
//! elsewhere in this lineage (typed errors below, `anyhow` context chains
//! above).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read OSM source: {0}")]
    Source(#[from] SourceError),

    #[error(
        "intersection count {count} exceeds the dense index range (2^32); cannot build graph"
    )]
    TooManyIntersections { count: u64 },

    #[error(
        "vertex {vertex} has degree {degree}, which overflows the 8-bit edge tally (max 255)"
    )]
    VertexDegreeOverflow { vertex: u32, degree: u32 },
}

/// Errors raised by an [`crate::source::OsmSource`] implementation while
/// streaming a pass. Covers both genuine I/O/decode failures and, for the
/// real PBF adapter, failures surfaced by the underlying decoder crate.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error reading OSM source: {0}")]
    Io(#[from] std::io::Error),

    #[error("PBF decode error: {0}")]
    Decode(String),
}
