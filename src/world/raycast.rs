//! Block picking by ray marching.
//!
//! The ray is advanced in small fixed steps until a sample lands inside a
//! solid block. The entered face is then recovered from the sample's position
//! inside that block: every face plane within a small epsilon band of the
//! sample is a candidate, candidates whose outward neighbor block is solid
//! are discarded, and the survivor whose outward normal points most directly
//! back at the ray wins. The reported distance is exact, computed by
//! projecting the ray onto the chosen face plane rather than taking the
//! stepped sample position.

use cgmath::{InnerSpace, Point3, Vector3};

use crate::block::BlockSide;

/// Distance the ray advances per sample. Small enough that a 1-block-thick
/// wall cannot be stepped over.
const RAY_STEP: f32 = 0.05;
/// Half-width of the face-candidate band. Must exceed `RAY_STEP` so the face
/// the ray actually crossed is always inside the band of the first interior
/// sample.
const FACE_EPSILON: f32 = 0.06;

/// The outcome of a raycast.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RaycastResult {
    /// Whether a solid block was hit within range
    pub hit: bool,
    /// Integer coordinates of the hit block
    pub block_pos: Point3<i32>,
    /// World-space point where the ray crosses the entered face
    pub hit_point: Point3<f32>,
    /// Outward normal of the entered face
    pub face_normal: Vector3<f32>,
    /// Distance from the ray origin to `hit_point`
    pub distance: f32,
}

impl RaycastResult {
    fn miss() -> Self {
        RaycastResult {
            hit: false,
            block_pos: Point3::new(0, 0, 0),
            hit_point: Point3::new(0.0, 0.0, 0.0),
            face_normal: Vector3::new(0.0, 0.0, 0.0),
            distance: 0.0,
        }
    }
}

/// Marches a ray through the solidity field and reports the first solid block
/// entered, if any, within `max_distance`.
///
/// `solid` answers whether the block at an integer coordinate is solid;
/// unloaded space should answer `false` so rays pass through it.
pub(crate) fn march(
    solid: impl Fn(Point3<i32>) -> bool,
    origin: Point3<f32>,
    direction: Vector3<f32>,
    max_distance: f32,
) -> RaycastResult {
    let length = direction.magnitude();
    if !length.is_finite() || length <= f32::EPSILON || !max_distance.is_finite() {
        return RaycastResult::miss();
    }
    let dir = direction / length;

    let mut travelled = 0.0;
    while travelled <= max_distance {
        let sample = origin + dir * travelled;
        let block_pos = Point3::new(
            sample.x.floor() as i32,
            sample.y.floor() as i32,
            sample.z.floor() as i32,
        );
        if solid(block_pos) {
            return resolve_face(&solid, origin, dir, sample, block_pos);
        }
        travelled += RAY_STEP;
    }
    RaycastResult::miss()
}

/// Picks the face the ray entered through and computes the exact crossing.
fn resolve_face(
    solid: &impl Fn(Point3<i32>) -> bool,
    origin: Point3<f32>,
    dir: Vector3<f32>,
    sample: Point3<f32>,
    block_pos: Point3<i32>,
) -> RaycastResult {
    let frac = sample
        - Point3::new(
            block_pos.x as f32,
            block_pos.y as f32,
            block_pos.z as f32,
        );

    // Distance from the sample to each of the six face planes.
    let plane_distance = |side: BlockSide| -> f32 {
        match side {
            BlockSide::LEFT => frac.x,
            BlockSide::RIGHT => 1.0 - frac.x,
            BlockSide::BOTTOM => frac.y,
            BlockSide::TOP => 1.0 - frac.y,
            BlockSide::BACK => frac.z,
            BlockSide::FRONT => 1.0 - frac.z,
        }
    };
    let open = |side: BlockSide| !solid(block_pos + side.offset());

    let pick = |candidates: &mut dyn Iterator<Item = BlockSide>| -> Option<BlockSide> {
        candidates
            .map(|side| (side, side.normal().dot(dir)))
            .filter(|(_, alignment)| *alignment < 0.0)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(side, _)| side)
    };

    // Faces inside the band with an open outward neighbor are the normal
    // case; a ray that clipped a corner of a buried block falls back to any
    // open face.
    let side = pick(
        &mut BlockSide::all()
            .into_iter()
            .filter(|&s| plane_distance(s) <= FACE_EPSILON && open(s)),
    )
    .or_else(|| pick(&mut BlockSide::all().into_iter().filter(|&s| open(s))));
    let side = match side {
        Some(side) => side,
        // Fully enclosed block (the ray started inside terrain).
        None => {
            return RaycastResult {
                hit: true,
                block_pos,
                hit_point: sample,
                face_normal: Vector3::new(0.0, 0.0, 0.0),
                distance: (sample - origin).magnitude(),
            };
        }
    };

    let normal = side.normal();
    let plane = match side {
        BlockSide::LEFT => block_pos.x as f32,
        BlockSide::RIGHT => (block_pos.x + 1) as f32,
        BlockSide::BOTTOM => block_pos.y as f32,
        BlockSide::TOP => (block_pos.y + 1) as f32,
        BlockSide::BACK => block_pos.z as f32,
        BlockSide::FRONT => (block_pos.z + 1) as f32,
    };
    let (origin_axis, dir_axis) = match side {
        BlockSide::LEFT | BlockSide::RIGHT => (origin.x, dir.x),
        BlockSide::BOTTOM | BlockSide::TOP => (origin.y, dir.y),
        BlockSide::BACK | BlockSide::FRONT => (origin.z, dir.z),
    };
    let distance = if dir_axis.abs() > f32::EPSILON {
        ((plane - origin_axis) / dir_axis).max(0.0)
    } else {
        (sample - origin).magnitude()
    };

    RaycastResult {
        hit: true,
        block_pos,
        hit_point: origin + dir * distance,
        face_normal: normal,
        distance,
    }
}
