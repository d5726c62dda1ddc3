//! Streaming PBF-to-routable-graph construction engine.
//!
//! Turns a sequential OpenStreetMap PBF node/way stream into a dense,
//! CSR-like vertex/edge graph in four passes (count, classify,
//! materialize+tally, emit), bounded by a pair of open-addressed dense-id
//! maps rather than by the size of the input file. See `build` for the
//! single entry point; `OsmSource` for the trait boundary around the raw
//! PBF decoder.

pub mod dense_map;
pub mod error;
pub mod geo;
pub mod graph;
pub mod pipeline;
pub mod source;

pub use error::{BuildError, SourceError};
pub use geo::{EquirectangularProjection, Projection};
pub use graph::{Edge, EdgeWeight, EuclideanWeight, Graph, UnitWeight, Vertex};
pub use pipeline::{build, build_with};
pub use source::{FixtureSource, NodeView, OsmSource, PbfFile, WayView};
