//! Frustum culling collaborator.
//!
//! The chunk cache treats each chunk as a bounding sphere and asks a
//! [`Culling`] implementation whether that sphere intersects the view
//! frustum. [`Frustum`] is the standard implementation, extracting the six
//! clip planes from a combined view-projection matrix.

use cgmath::Matrix4;

/// The sphere-visibility predicate the chunk cache consumes.
pub trait Culling {
    /// Whether a sphere at `(x, y, z)` with the given radius intersects the
    /// view frustum.
    fn sphere_in_frustum(&self, x: f32, y: f32, z: f32, radius: f32) -> bool;
}

/// Six frustum planes in the form `ax + by + cz + d`, normalized.
pub struct Frustum {
    planes: [[f32; 4]; 6],
}

impl Frustum {
    /// Extracts the clip planes from a combined view-projection matrix.
    ///
    /// Rows follow the Gribb/Hartmann construction: each plane is a sum or
    /// difference of the matrix's fourth row with one other row.
    pub fn from_matrix(m: Matrix4<f32>) -> Self {
        // cgmath stores columns; m.row(i) assembles the row we need.
        let row = |i: usize| -> [f32; 4] {
            [m.x[i], m.y[i], m.z[i], m.w[i]]
        };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let add = |a: [f32; 4], b: [f32; 4]| [a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]];
        let sub = |a: [f32; 4], b: [f32; 4]| [a[0] - b[0], a[1] - b[1], a[2] - b[2], a[3] - b[3]];

        let mut planes = [
            add(r3, r0), // left
            sub(r3, r0), // right
            add(r3, r1), // bottom
            sub(r3, r1), // top
            add(r3, r2), // near
            sub(r3, r2), // far
        ];
        for plane in planes.iter_mut() {
            let len = (plane[0] * plane[0] + plane[1] * plane[1] + plane[2] * plane[2]).sqrt();
            if len > 0.0 {
                for component in plane.iter_mut() {
                    *component /= len;
                }
            }
        }
        Frustum { planes }
    }
}

impl Culling for Frustum {
    fn sphere_in_frustum(&self, x: f32, y: f32, z: f32, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|p| p[0] * x + p[1] * y + p[2] * z + p[3] >= -radius)
    }
}
