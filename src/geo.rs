//! Coordinate projection: nanodegree lat/lon to decimeter (x, y).
//!
//! Expressed as a trait so the pass logic never hard-codes the projection
//! formula (see DESIGN.md "projection accuracy" — the source notes the
//! equirectangular projection distorts near the poles; this crate keeps
//! that projection but makes it swappable).

/// Decimeters per degree of latitude/longitude at the equator.
pub const DEC_PER_DEG: f64 = 1_111_111.1 * 10.0;

/// Projects nanodegree (lat, lon) pairs to decimeter (x, y) pairs.
pub trait Projection {
    fn project(&self, lat_nano: i64, lon_nano: i64) -> (i32, i32);
}

/// The equirectangular (plate carrée with cosine-latitude correction)
/// projection used by the source implementation:
///
/// `y = lat * DEC_PER_DEG`
/// `x = lon * cos(lat_radians) * DEC_PER_DEG`
///
/// Locally accurate; distorts near the poles at planet scale. Kept as the
/// default because nothing in this crate's scope needs better than local
/// accuracy for the CORE's purposes (routing costs, not cartography).
#[derive(Debug, Default, Clone, Copy)]
pub struct EquirectangularProjection;

impl Projection for EquirectangularProjection {
    fn project(&self, lat_nano: i64, lon_nano: i64) -> (i32, i32) {
        let lat_deg = lat_nano as f64 * 1e-9;
        let lon_deg = lon_nano as f64 * 1e-9;
        let lat_rad = lat_deg.to_radians();

        let y = lat_deg * DEC_PER_DEG;
        let x = lon_deg * lat_rad.cos() * DEC_PER_DEG;

        (x.round() as i32, y.round() as i32)
    }
}
