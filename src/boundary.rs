//! Per-face boundary rules for the simulation domain.
//!
//! The domain is an axis-aligned box with one rule per face. Rules are plain
//! variants dispatched by the environment's boundary engine; face-specific
//! state (the ghost-wall potential for [`BoundaryRule::RepulsiveForce`])
//! lives here rather than in per-call closures.

use crate::interactions::PairPotential;
use crate::math::{CENTER_BOUNDARY_ORIGIN, DVec3, IVec3, MAX_EXTENT};

/// What happens to a particle that interacts with a domain face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryRule {
    /// Particles crossing the face are removed from the simulation.
    Outflow,
    /// Particles exiting one side re-enter from the opposite side; forces
    /// act across the face via minimum-image displacement.
    Periodic,
    /// Particles near the face are repelled by a ghost wall: the boundary
    /// potential evaluated against the particle's mirror image.
    RepulsiveForce,
    /// Particles crossing the face have their normal velocity component
    /// reflected and their position projected back inside.
    VelocityReflection,
}

impl BoundaryRule {
    /// Scenario-file rule code (0..=3).
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(BoundaryRule::Outflow),
            1 => Some(BoundaryRule::Periodic),
            2 => Some(BoundaryRule::RepulsiveForce),
            3 => Some(BoundaryRule::VelocityReflection),
            _ => None,
        }
    }
}

/// Outward unit normals of the six faces in table order:
/// left, right, bottom, top, back, front.
pub const FACE_NORMALS: [IVec3; 6] = [
    IVec3::new(-1, 0, 0),
    IVec3::new(1, 0, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(0, 1, 0),
    IVec3::new(0, 0, -1),
    IVec3::new(0, 0, 1),
];

/// Face index for an axis and side; the low face of axis `a` is `2a`, the
/// high face `2a + 1`.
#[inline]
pub fn face_index(axis: usize, high_side: bool) -> usize {
    2 * axis + usize::from(high_side)
}

/// Axis (0..3) of a face index.
#[inline]
pub fn face_axis(face: usize) -> usize {
    face / 2
}

/// Whether the face is on the high side of its axis.
#[inline]
pub fn face_is_high(face: usize) -> bool {
    face % 2 == 1
}

/// The simulation domain: origin, extent, and one rule per face.
#[derive(Clone, Debug)]
pub struct Boundary {
    /// Lower corner of the domain. Components equal to
    /// [`CENTER_BOUNDARY_ORIGIN`] are resolved to `-extent/2` at build.
    pub origin: DVec3,
    /// Size of the domain along each axis.
    pub extent: DVec3,
    rules: [BoundaryRule; 6],
    boundary_force: Option<PairPotential>,
}

impl Default for Boundary {
    fn default() -> Self {
        Self::new()
    }
}

impl Boundary {
    /// An unbounded outflow boundary centered on the origin.
    pub fn new() -> Self {
        Self {
            origin: DVec3::splat(CENTER_BOUNDARY_ORIGIN),
            extent: DVec3::splat(MAX_EXTENT),
            rules: [BoundaryRule::Outflow; 6],
            boundary_force: None,
        }
    }

    /// Sets the same rule on all six faces.
    pub fn set_rule(&mut self, rule: BoundaryRule) {
        self.rules = [rule; 6];
    }

    /// Sets the rule on the face with the given outward normal.
    pub fn set_rule_on(&mut self, rule: BoundaryRule, normal: IVec3) {
        for (i, n) in FACE_NORMALS.iter().enumerate() {
            if *n == normal {
                self.rules[i] = rule;
                return;
            }
        }
        panic!("invalid face normal {normal:?}");
    }

    pub fn rule_on(&self, face: usize) -> BoundaryRule {
        self.rules[face]
    }

    pub fn rules(&self) -> &[BoundaryRule; 6] {
        &self.rules
    }

    /// Potential used by [`BoundaryRule::RepulsiveForce`] walls.
    pub fn set_boundary_force(&mut self, potential: PairPotential) {
        self.boundary_force = Some(potential);
    }

    pub fn boundary_force(&self) -> Option<&PairPotential> {
        self.boundary_force.as_ref()
    }

    /// Whether any face needs the ghost-wall potential.
    pub fn requires_force(&self) -> bool {
        self.rules.contains(&BoundaryRule::RepulsiveForce)
    }

    /// Whether crossings along this axis wrap. Pair enumeration wraps a
    /// stencil offset through the face it traverses, so the axis counts as
    /// periodic when either of its faces is.
    pub fn is_periodic(&self, axis: usize) -> bool {
        self.rules[face_index(axis, false)] == BoundaryRule::Periodic
            || self.rules[face_index(axis, true)] == BoundaryRule::Periodic
    }

    /// Coordinate of the face plane along its axis.
    #[inline]
    pub fn face_plane(&self, face: usize) -> f64 {
        let axis = face_axis(face);
        if face_is_high(face) {
            self.origin[axis] + self.extent[axis]
        } else {
            self.origin[axis]
        }
    }

    /// Faces whose planes the position lies beyond.
    pub(crate) fn exit_faces(&self, position: DVec3) -> Vec<usize> {
        let mut faces = Vec::with_capacity(3);
        for axis in 0..3 {
            if position[axis] < self.origin[axis] {
                faces.push(face_index(axis, false));
            } else if position[axis] > self.origin[axis] + self.extent[axis] {
                faces.push(face_index(axis, true));
            }
        }
        faces
    }

    /// Determines which face a particle that ended up outside actually
    /// crossed. For corner exits the path `old + t * (new - old)` is
    /// intersected with each candidate face plane; the first face (in axis
    /// order x, y, z) whose intersection parameter lies in `[0, 1]` and whose
    /// in-plane intersection point lies within the face rectangle wins.
    pub(crate) fn crossed_face(&self, old_position: DVec3, position: DVec3) -> Option<usize> {
        let candidates = self.exit_faces(position);
        match candidates.len() {
            0 => None,
            1 => Some(candidates[0]),
            _ => {
                let diff = position - old_position;
                let rel = old_position - self.origin;

                for &face in &candidates {
                    let axis = face_axis(face);
                    let plane = if face_is_high(face) { self.extent[axis] } else { 0.0 };
                    let t = (plane - rel[axis]) / diff[axis];
                    if !t.is_finite() || !(0.0..=1.0).contains(&t) {
                        continue;
                    }
                    let intersection = rel + t * diff;
                    let (a, b) = match axis {
                        0 => (1, 2),
                        1 => (0, 2),
                        _ => (0, 1),
                    };
                    if intersection[a] >= 0.0
                        && intersection[a] <= self.extent[a]
                        && intersection[b] >= 0.0
                        && intersection[b] <= self.extent[b]
                    {
                        return Some(face);
                    }
                }
                // Degenerate path (e.g. teleport artifacts): fall back to the
                // first exit axis.
                Some(candidates[0])
            }
        }
    }

    /// Whether the position lies inside the domain box (faces inclusive).
    pub fn contains(&self, position: DVec3) -> bool {
        (0..3).all(|axis| {
            let rel = position[axis] - self.origin[axis];
            rel >= 0.0 && rel <= self.extent[axis]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundary_10x10x1() -> Boundary {
        let mut boundary = Boundary::new();
        boundary.origin = DVec3::ZERO;
        boundary.extent = DVec3::new(10.0, 10.0, 1.0);
        boundary
    }

    #[test]
    fn face_indexing_round_trips() {
        for (face, normal) in FACE_NORMALS.iter().enumerate() {
            let axis = face_axis(face);
            assert_eq!(normal[axis], if face_is_high(face) { 1 } else { -1 });
            assert_eq!(face_index(axis, face_is_high(face)), face);
        }
    }

    #[test]
    fn single_face_exit() {
        let boundary = boundary_10x10x1();
        let face = boundary
            .crossed_face(DVec3::new(9.9, 5.0, 0.5), DVec3::new(10.2, 5.0, 0.5))
            .unwrap();
        assert_eq!(face, face_index(0, true));
    }

    #[test]
    fn corner_exit_resolves_to_the_first_crossed_face() {
        let boundary = boundary_10x10x1();
        // Leaves through the top before the left plane crossing becomes
        // valid: the top intersection happens at smaller t.
        let old = DVec3::new(0.3, 9.5, 0.5);
        let new = DVec3::new(-0.3, 10.7, 0.5);
        let face = boundary.crossed_face(old, new).unwrap();
        assert_eq!(face, face_index(1, true));
    }

    #[test]
    fn periodic_axis_detection() {
        let mut boundary = boundary_10x10x1();
        boundary.set_rule_on(BoundaryRule::Periodic, IVec3::new(0, 1, 0));
        assert!(boundary.is_periodic(1));
        assert!(!boundary.is_periodic(0));
    }
}
