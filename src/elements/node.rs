//! Node - a point in 3D space carrying DOF numbering and kinematic state

use serde::{Deserialize, Serialize};

use super::Direction;
use crate::math::Vec3;

/// A 3D node in the finite element model
///
/// The DOF array starts empty and is grown by the partitioner to the largest
/// DOF count of the elements touching the node. Kinematic arrays are at least
/// as long as the DOF array; initial conditions may extend them further, and
/// entries beyond the DOF array are ignored by the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,

    /// Global DOF index per direction (`None` = not yet numbered)
    #[serde(skip)]
    pub(crate) dofs: Vec<Option<usize>>,

    #[serde(skip)]
    pub(crate) displacement: Vec<f64>,
    #[serde(skip)]
    pub(crate) velocity: Vec<f64>,
    #[serde(skip)]
    pub(crate) acceleration: Vec<f64>,
    /// Scattered element internal force (reaction at fixed DOFs)
    #[serde(skip)]
    pub(crate) force: Vec<f64>,
}

impl Node {
    /// Create a new node at the given coordinates
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            dofs: Vec::new(),
            displacement: Vec::new(),
            velocity: Vec::new(),
            acceleration: Vec::new(),
            force: Vec::new(),
        }
    }

    /// Initial position as a vector
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Calculate distance to another node
    pub fn distance_to(&self, other: &Node) -> f64 {
        (other.position() - self.position()).norm()
    }

    /// Number of DOFs currently owned by the node
    pub fn num_dofs(&self) -> usize {
        self.dofs.len()
    }

    /// DOF numbering, one entry per direction
    pub fn dofs(&self) -> &[Option<usize>] {
        &self.dofs
    }

    /// Global DOF index of a direction, if numbered
    pub fn dof(&self, direction: Direction) -> Option<usize> {
        self.dofs.get(direction.index()).copied().flatten()
    }

    /// Grow the DOF array (and the kinematic arrays) to at least `n` entries.
    /// Never shrinks.
    pub(crate) fn ensure_dofs(&mut self, n: usize) {
        if self.dofs.len() >= n {
            return;
        }
        self.dofs.resize(n, None);
        self.grow_state(n);
    }

    /// Grow the kinematic arrays to at least `n` entries
    fn grow_state(&mut self, n: usize) {
        for arr in [
            &mut self.displacement,
            &mut self.velocity,
            &mut self.acceleration,
            &mut self.force,
        ] {
            if arr.len() < n {
                arr.resize(n, 0.0);
            }
        }
    }

    /// Return every DOF entry to the unassigned state
    pub(crate) fn reset_dofs(&mut self) {
        self.dofs.iter_mut().for_each(|d| *d = None);
    }

    /// Zero all kinematic state
    pub(crate) fn reset_state(&mut self) {
        for arr in [
            &mut self.displacement,
            &mut self.velocity,
            &mut self.acceleration,
            &mut self.force,
        ] {
            arr.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    /// Displacement in a direction (0 if the node has no such DOF)
    pub fn displacement(&self, direction: Direction) -> f64 {
        self.displacement.get(direction.index()).copied().unwrap_or(0.0)
    }

    /// Velocity in a direction
    pub fn velocity(&self, direction: Direction) -> f64 {
        self.velocity.get(direction.index()).copied().unwrap_or(0.0)
    }

    /// Acceleration in a direction
    pub fn acceleration(&self, direction: Direction) -> f64 {
        self.acceleration.get(direction.index()).copied().unwrap_or(0.0)
    }

    /// Accumulated internal force in a direction
    pub fn force(&self, direction: Direction) -> f64 {
        self.force.get(direction.index()).copied().unwrap_or(0.0)
    }

    /// Set an initial displacement. The DOF array is left to the elements,
    /// so a direction none of them carries has no effect on the analysis.
    pub fn set_displacement(&mut self, direction: Direction, value: f64) {
        self.grow_state(direction.index() + 1);
        self.displacement[direction.index()] = value;
    }

    /// Set an initial velocity, see [`Node::set_displacement`]
    pub fn set_velocity(&mut self, direction: Direction, value: f64) {
        self.grow_state(direction.index() + 1);
        self.velocity[direction.index()] = value;
    }

    /// Translational displacement vector [DX, DY, DZ]
    pub fn translation(&self) -> Vec3 {
        Vec3::new(
            self.displacement(Direction::X),
            self.displacement(Direction::Y),
            self.displacement(Direction::Z),
        )
    }

    /// Position in the deformed configuration
    pub fn current_position(&self) -> Vec3 {
        self.position() + self.translation()
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let node = Node::new(1.0, 2.0, 3.0);
        assert_eq!(node.x, 1.0);
        assert_eq!(node.y, 2.0);
        assert_eq!(node.z, 3.0);
        assert_eq!(node.num_dofs(), 0);
    }

    #[test]
    fn test_node_distance() {
        let n1 = Node::new(0.0, 0.0, 0.0);
        let n2 = Node::new(3.0, 4.0, 0.0);
        assert!((n1.distance_to(&n2) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_dof_array_never_shrinks() {
        let mut node = Node::default();
        node.ensure_dofs(6);
        node.ensure_dofs(3);
        assert_eq!(node.num_dofs(), 6);
        assert_eq!(node.displacement.len(), 6);
        assert!(node.dofs().iter().all(Option::is_none));
    }

    #[test]
    fn test_initial_conditions_leave_dofs_alone() {
        let mut node = Node::default();
        node.set_velocity(Direction::RZ, 1.5);
        assert_eq!(node.num_dofs(), 0);
        assert_eq!(node.velocity(Direction::RZ), 1.5);

        node.ensure_dofs(3);
        assert_eq!(node.num_dofs(), 3);
        assert_eq!(node.velocity.len(), 6);
        assert_eq!(node.velocity(Direction::RZ), 1.5);
    }

    #[test]
    fn test_current_position() {
        let mut node = Node::new(1.0, 0.0, 0.0);
        node.set_displacement(Direction::X, 0.5);
        node.set_displacement(Direction::Z, -0.25);
        let p = node.current_position();
        assert!((p.x - 1.5).abs() < 1e-12);
        assert!((p.z + 0.25).abs() < 1e-12);
        assert_eq!(node.velocity(Direction::RZ), 0.0);
    }
}
