//! The four-pass driver: `P1 count -> P2 classify -> P3 materialize+tally
//! -> P4 emit`, folded into a single [`BuildContext`] value that's threaded
//! through each pass in place of the source implementation's module-level
//! statics (see DESIGN.md "process-wide mutable state").

use crate::dense_map::{DenseIdMap, ABSENT};
use crate::error::BuildError;
use crate::geo::{EquirectangularProjection, Projection};
use crate::graph::{Edge, EdgeWeight, Graph, UnitWeight, Vertex, EDGE_FLAG_OCCUPIED};
use crate::source::{OsmSource, WayView};

/// Per-vertex outgoing-edge tally. `u8` per §7: an implementation must
/// refuse rather than silently truncate once a vertex's degree exceeds 255.
const MAX_VERTEX_DEGREE: u32 = u8::MAX as u32;

/// Coordinates, tallies, and dense maps threaded through P1-P4. Replaces
/// the module-level mutable state the source keeps; every pass borrows
/// this mutably and nothing outlives a single [`build`] call.
struct BuildContext {
    n_total: u64,
    highway_index: DenseIdMap,
    intersection_index: DenseIdMap,
    /// Indexed by highway dense id.
    coordinates: Vec<(i32, i32)>,
    /// Indexed by intersection dense id; grows as P2 discovers vertices.
    tally: Vec<u8>,
    /// Indexed by intersection dense id. Every intersection is also a
    /// highway node, so this is filled from the same node pass as
    /// `coordinates` rather than recomputed later from the OSM id.
    intersection_coordinates: Vec<(i32, i32)>,
}

impl BuildContext {
    fn de_delta(refs: &[i64]) -> Vec<i64> {
        let mut out = Vec::with_capacity(refs.len());
        let mut running = 0i64;
        for (i, &d) in refs.iter().enumerate() {
            running = if i == 0 { d } else { running + d };
            out.push(running);
        }
        out
    }
}

/// Runs the full build against any [`OsmSource`], using the default
/// projection ([`EquirectangularProjection`]) and edge weigher
/// ([`UnitWeight`]). See [`build_with`] to override either.
pub fn build(source: &impl OsmSource) -> Result<Graph, BuildError> {
    build_with(source, &EquirectangularProjection, &UnitWeight)
}

/// Runs the full build with a caller-supplied projection and edge weigher.
pub fn build_with(
    source: &impl OsmSource,
    projection: &impl Projection,
    weigher: &impl EdgeWeight,
) -> Result<Graph, BuildError> {
    let mut ctx = BuildContext {
        n_total: 0,
        // Sized in pass1_count; a throwaway table until then.
        highway_index: DenseIdMap::new(16),
        intersection_index: DenseIdMap::new(16),
        coordinates: Vec::new(),
        tally: Vec::new(),
        intersection_coordinates: Vec::new(),
    };

    pass1_count(source, &mut ctx)?;

    // Highway map sized against the pass it measured directly; the
    // intersection map has no equivalent pre-count, so half of N_total is
    // used as a safe starting hint (§4.1) — grow() covers an undershoot.
    ctx.highway_index = DenseIdMap::new(0);
    ctx.intersection_index = DenseIdMap::new((ctx.n_total / 2) as usize);

    pass2_classify(source, &mut ctx)?;

    let h = ctx.highway_index.len();
    ctx.highway_index = DenseIdMap::new(h);
    ctx.coordinates = vec![(0, 0); h];
    ctx.tally = vec![0u8; ctx.intersection_index.len()];
    ctx.intersection_coordinates = vec![(0, 0); ctx.intersection_index.len()];

    // pass2_classify above populated highway_index/intersection_index in a
    // throwaway table sized for counting only; replay it against the
    // correctly-sized table so dense ids match first-encounter order.
    rebuild_indices(source, &mut ctx)?;

    pass3_materialize_and_tally(source, &mut ctx, projection)?;

    let v = ctx.intersection_index.len() as u64;
    if v > u32::MAX as u64 {
        return Err(BuildError::TooManyIntersections { count: v });
    }

    let (vertices, total_edge_count) = allocate_edge_array(&ctx.tally)?;
    let edges = vec![Edge::default(); total_edge_count];

    let mut graph = Graph { vertices, edges };
    pass4_emit(source, &ctx, &mut graph, weigher)?;

    Ok(graph)
}

fn pass1_count(source: &impl OsmSource, ctx: &mut BuildContext) -> Result<(), BuildError> {
    source.for_each_node(&mut |_node| {
        ctx.n_total += 1;
    })?;
    Ok(())
}

/// P2 as specified: walks every way, assigning highway/intersection dense
/// ids in first-encounter order. Run twice — once through a throwaway
/// count-only table (to learn `H`), once for real against a table sized to
/// `H` — so the final dense ids are gap-free without ever shrinking a live
/// table mid-assignment.
fn pass2_classify(source: &impl OsmSource, ctx: &mut BuildContext) -> Result<(), BuildError> {
    source.for_each_way(&mut |way: WayView| {
        classify_way(&way, &mut ctx.highway_index, &mut ctx.intersection_index);
    })?;
    Ok(())
}

fn rebuild_indices(source: &impl OsmSource, ctx: &mut BuildContext) -> Result<(), BuildError> {
    ctx.intersection_index = DenseIdMap::new(ctx.intersection_index.len());
    source.for_each_way(&mut |way: WayView| {
        classify_way(&way, &mut ctx.highway_index, &mut ctx.intersection_index);
    })?;
    Ok(())
}

fn classify_way(way: &WayView, highway_index: &mut DenseIdMap, intersection_index: &mut DenseIdMap) {
    if !way.is_routable() {
        return;
    }
    let refs = BuildContext::de_delta(way.delta_refs);
    let n = refs.len();
    if n == 0 {
        return;
    }

    for (i, &r) in refs.iter().enumerate() {
        let is_endpoint = i == 0 || i == n - 1;
        if is_endpoint || highway_index.contains(r) {
            if !intersection_index.contains(r) {
                let next_id = intersection_index.len() as u32;
                intersection_index.put(r, next_id);
            }
        } else {
            if !highway_index.contains(r) {
                let next_id = highway_index.len() as u32;
                highway_index.put(r, next_id);
            }
        }
    }
}

fn pass3_materialize_and_tally(
    source: &impl OsmSource,
    ctx: &mut BuildContext,
    projection: &impl Projection,
) -> Result<(), BuildError> {
    source.for_each_node(&mut |node| {
        let idx = ctx.highway_index.get(node.id);
        if idx == ABSENT {
            return;
        }
        let (x, y) = projection.project(node.lat_nano, node.lon_nano);
        ctx.coordinates[idx as usize] = (x, y);

        let vertex_idx = ctx.intersection_index.get(node.id);
        if vertex_idx != ABSENT {
            ctx.intersection_coordinates[vertex_idx as usize] = (x, y);
        }
    })?;

    let mut overflow: Option<(u32, u32)> = None;
    source.for_each_way(&mut |way: WayView| {
        if overflow.is_some() {
            return;
        }
        let refs = way.absolute_refs();
        if refs.len() < 2 || !way.is_routable() {
            return;
        }
        let idx_a = ctx.intersection_index.get(refs[0]);
        if idx_a == ABSENT {
            // Malformed input: P2 guarantees the first ref is always an
            // intersection. Skip the way rather than fail the build.
            return;
        }

        let mut anchor = idx_a;
        for &r in &refs[1..] {
            let idx_b = ctx.intersection_index.get(r);
            if idx_b == ABSENT {
                continue;
            }
            if let Err(v) = bump_tally(&mut ctx.tally, anchor) {
                overflow = Some((anchor, v));
                return;
            }
            if let Err(v) = bump_tally(&mut ctx.tally, idx_b) {
                overflow = Some((idx_b, v));
                return;
            }
            anchor = idx_b;
        }
    })?;

    if let Some((vertex, degree)) = overflow {
        return Err(BuildError::VertexDegreeOverflow { vertex, degree });
    }

    Ok(())
}

fn bump_tally(tally: &mut [u8], vertex: u32) -> Result<(), u32> {
    let slot = &mut tally[vertex as usize];
    let next = *slot as u32 + 1;
    if next > MAX_VERTEX_DEGREE {
        return Err(next);
    }
    *slot = next as u8;
    Ok(())
}

/// Builds `vertices[0..=V]` from the per-vertex tally via prefix sum,
/// returning the vertex table and the total edge count (`vertices[V]`).
fn allocate_edge_array(tally: &[u8]) -> Result<(Vec<Vertex>, usize), BuildError> {
    let v = tally.len();
    let mut vertices = vec![Vertex::default(); v + 1];
    let mut offset = 0u32;
    for i in 0..v {
        vertices[i].first_edge = offset;
        offset += tally[i] as u32;
    }
    vertices[v].first_edge = offset;
    Ok((vertices, offset as usize))
}

fn pass4_emit(
    source: &impl OsmSource,
    ctx: &BuildContext,
    graph: &mut Graph,
    weigher: &impl EdgeWeight,
) -> Result<(), BuildError> {
    // Copy coordinates into the vertex table by intersection index — every
    // intersection is also a highway node (§3 invariant), so P3 filled
    // intersection_coordinates for every slot this touches.
    for (v, &(x, y)) in ctx.intersection_coordinates.iter().enumerate() {
        graph.vertices[v].x = x;
        graph.vertices[v].y = y;
    }

    source.for_each_way(&mut |way: WayView| {
        if !way.is_routable() {
            return;
        }
        let refs = way.absolute_refs();
        if refs.len() < 2 {
            return;
        }
        let idx_a = ctx.intersection_index.get(refs[0]);
        if idx_a == ABSENT {
            return;
        }

        let mut anchor = idx_a;
        for &r in &refs[1..] {
            let idx_b = ctx.intersection_index.get(r);
            if idx_b == ABSENT {
                continue;
            }
            emit_pair(graph, anchor, idx_b, weigher);
            anchor = idx_b;
        }
    })?;

    Ok(())
}

/// Writes both directions of an edge, filling each endpoint's coordinates
/// into its vertex record the first time that vertex is touched.
fn emit_pair(graph: &mut Graph, a: u32, b: u32, weigher: &impl EdgeWeight) {
    // Coordinates are attached lazily here via the highway map lookup done
    // in materialize; vertex x/y are populated by fill_vertex_coordinates
    // before this is called (see pass3_materialize_and_tally / build_with).
    let (ax, ay) = (graph.vertices[a as usize].x, graph.vertices[a as usize].y);
    let (bx, by) = (graph.vertices[b as usize].x, graph.vertices[b as usize].y);
    let length = weigher.weigh(bx - ax, by - ay);

    emit(graph, a, b, length);
    emit(graph, b, a, length);
}

/// Finds the first unused slot in vertex `a`'s run by scanning forward
/// from `first_edge`, writes the edge record. Terminates at or before the
/// next vertex's `first_edge` because P3 tallied the exact count.
fn emit(graph: &mut Graph, a: u32, b: u32, length: u16) {
    let start = graph.vertices[a as usize].first_edge as usize;
    let end = graph.vertices[a as usize + 1].first_edge as usize;
    for slot in &mut graph.edges[start..end] {
        if slot.flags == 0 {
            slot.target_vertex = b;
            slot.length = length;
            slot.flags = EDGE_FLAG_OCCUPIED;
            return;
        }
    }
    debug_assert!(false, "vertex {a} ran out of pre-tallied edge slots");
}
