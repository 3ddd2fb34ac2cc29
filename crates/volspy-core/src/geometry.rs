//! Bounding geometry of the volume: a unit cube, optionally clipped by a plane.
//!
//! The cube is centred on the origin with positions in `[-0.5, 0.5]^3` and
//! texture coordinates in `[0, 1]^3`. Clipping keeps the half-space with
//! non-negative signed distance, re-triangulates the cut faces, and closes the
//! solid with a cap polygon lying on the plane. The cap is also returned on its
//! own for slice rendering.

use std::collections::HashMap;

use glam::Vec3;

use crate::clip::ClipPlane;

/// 8 corners plus at most 6 edge crossings.
pub const MAX_CLIPPED_VERTICES: usize = 14;

/// 6 faces of at most 5 vertices (3 triangles each) plus a hexagonal cap (4 triangles).
pub const MAX_SOLID_INDICES: usize = 66;

/// A hexagonal cap fans into 4 triangles.
pub const MAX_CAP_INDICES: usize = 12;

/// Distances closer than this snap onto the plane.
const PLANE_EPSILON: f32 = 1e-6;

/// Corner `i` sits at `((i & 1), (i >> 1) & 1, (i >> 2) & 1) - 0.5`.
const CORNER_COUNT: usize = 8;

/// Cube faces as corner rings, counter-clockwise seen from outside.
const FACES: [[usize; 4]; 6] = [
    [0, 4, 6, 2], // -X
    [1, 3, 7, 5], // +X
    [0, 1, 5, 4], // -Y
    [2, 6, 7, 3], // +Y
    [0, 2, 3, 1], // -Z
    [4, 5, 7, 6], // +Z
];

/// A bounding-geometry vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CubeVertex {
    /// Model-space position.
    pub position: [f32; 3],
    /// 3D texture coordinate of the position.
    pub texcoord: [f32; 3],
}

impl CubeVertex {
    fn corner(i: usize) -> Self {
        let texcoord = [
            (i & 1) as f32,
            ((i >> 1) & 1) as f32,
            ((i >> 2) & 1) as f32,
        ];
        Self {
            position: texcoord.map(|t| t - 0.5),
            texcoord,
        }
    }

    fn lerp(&self, other: &Self, t: f32) -> Self {
        let lerp3 = |a: [f32; 3], b: [f32; 3]| Vec3::from(a).lerp(Vec3::from(b), t).to_array();
        Self {
            position: lerp3(self.position, other.position),
            texcoord: lerp3(self.texcoord, other.texcoord),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    pub fn texcoord(&self) -> Vec3 {
        Vec3::from(self.texcoord)
    }
}

/// Output of [`make_cube_clipped`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClippedCube {
    /// Shared vertex list.
    pub vertices: Vec<CubeVertex>,
    /// Triangles of the closed clipped solid (cut faces and cap).
    pub solid_indices: Vec<u32>,
    /// Triangles of the cap polygon alone; empty when the plane does not cut.
    pub cap_indices: Vec<u32>,
}

impl ClippedCube {
    pub fn solid_triangle_count(&self) -> usize {
        self.solid_indices.len() / 3
    }

    pub fn cap_triangle_count(&self) -> usize {
        self.cap_indices.len() / 3
    }

    /// True when nothing of the cube remains.
    pub fn is_empty(&self) -> bool {
        self.solid_indices.is_empty()
    }

    /// Triangles of `indices` as vertex triples.
    pub fn triangles<'a>(
        &'a self,
        indices: &'a [u32],
    ) -> impl Iterator<Item = [&'a CubeVertex; 3]> + 'a {
        indices.chunks_exact(3).map(move |tri| {
            [
                &self.vertices[tri[0] as usize],
                &self.vertices[tri[1] as usize],
                &self.vertices[tri[2] as usize],
            ]
        })
    }
}

/// Builds the cube clipped by `plane`, or the whole cube for `None`.
///
/// Corners with negative signed distance are discarded. Every edge with
/// endpoints strictly on opposite sides gets one interpolated vertex, shared
/// by the two faces using that edge. A plane that only touches the cube is
/// not a cut: the result is then the full cube, or empty when nothing lies on
/// the positive side.
pub fn make_cube_clipped(plane: Option<&ClipPlane>) -> ClippedCube {
    let Some(plane) = plane else {
        return unclipped_cube();
    };

    let distances: [f32; CORNER_COUNT] = std::array::from_fn(|i| {
        let d = plane.signed_distance(CubeVertex::corner(i).position());
        if d.abs() < PLANE_EPSILON {
            0.0
        } else {
            d
        }
    });

    if distances.iter().all(|&d| d >= 0.0) {
        return unclipped_cube();
    }
    if distances.iter().all(|&d| d <= 0.0) {
        return ClippedCube::default();
    }

    let mut builder = ClipBuilder::new(distances);

    for face in &FACES {
        let polygon = builder.clip_face(face);
        builder.push_fan(&polygon, false);
    }

    let cap = builder.cap_polygon(-plane.normal());
    builder.push_fan(&cap, true);

    builder.finish()
}

fn unclipped_cube() -> ClippedCube {
    let vertices = (0..CORNER_COUNT).map(CubeVertex::corner).collect();
    let mut solid_indices = Vec::with_capacity(36);
    for face in &FACES {
        let ring = face.map(|c| c as u32);
        solid_indices.extend_from_slice(&[ring[0], ring[1], ring[2], ring[0], ring[2], ring[3]]);
    }
    ClippedCube {
        vertices,
        solid_indices,
        cap_indices: Vec::new(),
    }
}

/// Accumulates the shared vertex list while faces are clipped.
struct ClipBuilder {
    distances: [f32; CORNER_COUNT],
    vertices: Vec<CubeVertex>,
    corner_slots: [Option<u32>; CORNER_COUNT],
    edge_slots: HashMap<(usize, usize), u32>,
    solid_indices: Vec<u32>,
    cap_indices: Vec<u32>,
}

impl ClipBuilder {
    fn new(distances: [f32; CORNER_COUNT]) -> Self {
        Self {
            distances,
            vertices: Vec::with_capacity(MAX_CLIPPED_VERTICES),
            corner_slots: [None; CORNER_COUNT],
            edge_slots: HashMap::new(),
            solid_indices: Vec::with_capacity(MAX_SOLID_INDICES),
            cap_indices: Vec::with_capacity(MAX_CAP_INDICES),
        }
    }

    fn corner_vertex(&mut self, corner: usize) -> u32 {
        if let Some(slot) = self.corner_slots[corner] {
            return slot;
        }
        let slot = self.vertices.len() as u32;
        self.vertices.push(CubeVertex::corner(corner));
        self.corner_slots[corner] = Some(slot);
        slot
    }

    fn edge_vertex(&mut self, a: usize, b: usize) -> u32 {
        let key = (a.min(b), a.max(b));
        if let Some(&slot) = self.edge_slots.get(&key) {
            return slot;
        }
        let (da, db) = (self.distances[key.0], self.distances[key.1]);
        let t = da / (da - db);
        let vertex = CubeVertex::corner(key.0).lerp(&CubeVertex::corner(key.1), t);
        let slot = self.vertices.len() as u32;
        self.vertices.push(vertex);
        self.edge_slots.insert(key, slot);
        slot
    }

    /// Clips one face ring against the kept half-space.
    fn clip_face(&mut self, ring: &[usize; 4]) -> Vec<u32> {
        let mut polygon = Vec::with_capacity(5);
        for k in 0..ring.len() {
            let a = ring[k];
            let b = ring[(k + 1) % ring.len()];
            let (da, db) = (self.distances[a], self.distances[b]);
            if da >= 0.0 {
                polygon.push(self.corner_vertex(a));
            }
            if (da < 0.0 && db > 0.0) || (da > 0.0 && db < 0.0) {
                polygon.push(self.edge_vertex(a, b));
            }
        }
        polygon
    }

    /// Vertices on the plane, ordered counter-clockwise around `outward`.
    fn cap_polygon(&self, outward: Vec3) -> Vec<u32> {
        let on_plane_corners = self
            .corner_slots
            .iter()
            .zip(self.distances)
            .filter_map(|(slot, d)| if d == 0.0 { *slot } else { None });
        let mut polygon: Vec<u32> = self
            .edge_slots
            .values()
            .copied()
            .chain(on_plane_corners)
            .collect();
        polygon.sort_unstable();
        polygon.dedup();

        if polygon.len() < 3 {
            return Vec::new();
        }
        order_polygon_vertices(&mut polygon, &self.vertices, outward);
        polygon
    }

    fn push_fan(&mut self, polygon: &[u32], is_cap: bool) {
        if polygon.len() < 3 {
            return;
        }
        for i in 1..polygon.len() - 1 {
            let tri = [polygon[0], polygon[i], polygon[i + 1]];
            self.solid_indices.extend_from_slice(&tri);
            if is_cap {
                self.cap_indices.extend_from_slice(&tri);
            }
        }
    }

    fn finish(self) -> ClippedCube {
        debug_assert!(self.vertices.len() <= MAX_CLIPPED_VERTICES);
        debug_assert!(self.solid_indices.len() <= MAX_SOLID_INDICES);
        debug_assert!(self.cap_indices.len() <= MAX_CAP_INDICES);
        ClippedCube {
            vertices: self.vertices,
            solid_indices: self.solid_indices,
            cap_indices: self.cap_indices,
        }
    }
}

/// Sorts polygon vertices by angle around their centroid, counter-clockwise about `normal`.
fn order_polygon_vertices(polygon: &mut [u32], vertices: &[CubeVertex], normal: Vec3) {
    let position = |i: u32| vertices[i as usize].position();
    let centroid: Vec3 =
        polygon.iter().map(|&i| position(i)).sum::<Vec3>() / polygon.len() as f32;
    let ref_dir = (position(polygon[0]) - centroid).normalize();

    let angle = |i: u32| {
        let v = (position(i) - centroid).normalize();
        ref_dir.cross(v).dot(normal).atan2(ref_dir.dot(v))
    };

    polygon.sort_by(|&a, &b| {
        angle(a)
            .partial_cmp(&angle(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
