//! Quad faces and the grid/cell coordinate mapping used by the meshers.
//!
//! Both meshers work per face direction in a 2D "slice" space: `d` is the
//! depth along the face's axis, and `(a, b)` address cells within the slice.
//! The mapping is chosen so that `a` runs along the quad's width edge and `b`
//! along its height edge, with width-edge x height-edge equal to the outward
//! normal. That single invariant gives counter-clockwise winding for every
//! side without per-side special cases at emission time.

use cgmath::{Point3, Vector3};

use crate::block::{BlockSide, BlockType};

/// A single rectangular quad on a chunk face.
///
/// The quad lies on the boundary plane of the cells it covers and is
/// described by its grid origin plus extents along the slice axes. The
/// outward normal is implied by `side` and stored once per quad, not per
/// vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Which side of the covered blocks this quad faces
    pub side: BlockSide,
    /// Depth of the slice this quad lies in, along the face axis
    pub depth: i32,
    /// Grid origin of the quad within the slice
    pub a: i32,
    /// Grid origin of the quad within the slice
    pub b: i32,
    /// Extent along the slice's `a` axis
    pub width: i32,
    /// Extent along the slice's `b` axis
    pub height: i32,
    /// The block type the quad renders
    pub block_type: BlockType,
}

impl Face {
    /// Creates a quad covering the rectangle `[a, a+width) x [b, b+height)`
    /// in slice `depth` of the given side.
    pub fn quad(
        side: BlockSide,
        depth: i32,
        a: i32,
        b: i32,
        width: i32,
        height: i32,
        block_type: BlockType,
    ) -> Self {
        Face {
            side,
            depth,
            a,
            b,
            width,
            height,
            block_type,
        }
    }

    /// Returns the quad's corners in local chunk space, ordered
    /// `[ll, lr, ul, ur]`.
    ///
    /// `lr - ll` is the width edge and `ul - ll` the height edge; their cross
    /// product equals the outward normal, so emitting triangles
    /// `(ll, lr, ur)` and `(ll, ur, ul)` yields counter-clockwise winding.
    pub fn corners(&self) -> [Point3<i32>; 4] {
        let (base, e1, e2) = self.frame();
        let ll = base;
        let lr = base + e1 * self.width;
        let ul = base + e2 * self.height;
        let ur = base + e1 * self.width + e2 * self.height;
        [ll, lr, ul, ur]
    }

    /// The quad's base corner and edge directions for its side.
    fn frame(&self) -> (Point3<i32>, Vector3<i32>, Vector3<i32>) {
        let (d, a, b) = (self.depth, self.a, self.b);
        match self.side {
            BlockSide::RIGHT => (
                Point3::new(d + 1, a, b),
                Vector3::new(0, 1, 0),
                Vector3::new(0, 0, 1),
            ),
            BlockSide::LEFT => (
                Point3::new(d, b, a),
                Vector3::new(0, 0, 1),
                Vector3::new(0, 1, 0),
            ),
            BlockSide::TOP => (
                Point3::new(b, d + 1, a),
                Vector3::new(0, 0, 1),
                Vector3::new(1, 0, 0),
            ),
            BlockSide::BOTTOM => (
                Point3::new(a, d, b),
                Vector3::new(1, 0, 0),
                Vector3::new(0, 0, 1),
            ),
            BlockSide::FRONT => (
                Point3::new(a, b, d + 1),
                Vector3::new(1, 0, 0),
                Vector3::new(0, 1, 0),
            ),
            BlockSide::BACK => (
                Point3::new(b, a, d),
                Vector3::new(0, 1, 0),
                Vector3::new(1, 0, 0),
            ),
        }
    }
}

/// Maps a slice-space address `(depth, a, b)` to a local block coordinate.
pub fn grid_to_cell(side: BlockSide, d: i32, a: i32, b: i32) -> (i32, i32, i32) {
    match side {
        BlockSide::RIGHT => (d, a, b),
        BlockSide::LEFT => (d, b, a),
        BlockSide::TOP => (b, d, a),
        BlockSide::BOTTOM => (a, d, b),
        BlockSide::FRONT => (a, b, d),
        BlockSide::BACK => (b, a, d),
    }
}

/// Maps a local block coordinate to its slice-space address `(depth, a, b)`.
pub fn cell_to_grid(side: BlockSide, x: i32, y: i32, z: i32) -> (i32, i32, i32) {
    match side {
        BlockSide::RIGHT => (x, y, z),
        BlockSide::LEFT => (x, z, y),
        BlockSide::TOP => (y, z, x),
        BlockSide::BOTTOM => (y, x, z),
        BlockSide::FRONT => (z, x, y),
        BlockSide::BACK => (z, y, x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_mapping_round_trips() {
        for side in BlockSide::all() {
            for (x, y, z) in [(0, 0, 0), (1, 2, 3), (15, 0, 7)] {
                let (d, a, b) = cell_to_grid(side, x, y, z);
                assert_eq!(grid_to_cell(side, d, a, b), (x, y, z));
            }
        }
    }

    #[test]
    fn winding_matches_outward_normal() {
        for side in BlockSide::all() {
            let face = Face::quad(side, 4, 2, 3, 2, 5, BlockType::STONE);
            let [ll, lr, ul, _ur] = face.corners();
            let e1 = lr - ll;
            let e2 = ul - ll;
            // The cross product of the width and height edges must point
            // along the outward normal.
            let n = side.offset();
            let c = e1.cross(e2);
            assert!(c.x * n.x + c.y * n.y + c.z * n.z > 0, "{:?}", side);
            assert_eq!(c.x * n.y, c.y * n.x);
            assert_eq!(c.y * n.z, c.z * n.y);
        }
    }
}
