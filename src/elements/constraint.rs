//! Boundary constraints

use serde::{Deserialize, Serialize};

/// Kinematic direction at a node. The discriminant is the DOF slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    X,
    Y,
    Z,
    RX,
    RY,
    RZ,
}

impl Direction {
    /// All six directions in DOF-slot order
    pub const ALL: [Direction; 6] = [
        Direction::X,
        Direction::Y,
        Direction::Z,
        Direction::RX,
        Direction::RY,
        Direction::RZ,
    ];

    /// Translational directions
    pub const TRANSLATIONS: [Direction; 3] = [Direction::X, Direction::Y, Direction::Z];

    /// DOF slot of this direction (0-5)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Direction for a DOF slot
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Whether this is a rotational direction
    pub fn is_rotation(self) -> bool {
        self.index() >= 3
    }
}

/// A single constrained direction at a node.
///
/// `value == 0.0` fixes the DOF, any other value prescribes a displacement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Constrained node id
    pub node: usize,
    /// Constrained direction
    pub direction: Direction,
    /// Prescribed displacement
    pub value: f64,
}

impl Constraint {
    /// Create a constraint with a prescribed displacement
    pub fn new(node: usize, direction: Direction, value: f64) -> Self {
        Self {
            node,
            direction,
            value,
        }
    }

    /// Create a fixed (zero displacement) constraint
    pub fn fixed(node: usize, direction: Direction) -> Self {
        Self::new(node, direction, 0.0)
    }

    /// Translations restrained, rotations free
    pub fn pinned(node: usize) -> [Self; 3] {
        Direction::TRANSLATIONS.map(|d| Self::fixed(node, d))
    }

    /// All six directions restrained
    pub fn clamped(node: usize) -> [Self; 6] {
        Direction::ALL.map(|d| Self::fixed(node, d))
    }

    /// Whether this constraint enforces a nonzero displacement
    pub fn is_prescribed(&self) -> bool {
        self.value != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_slots() {
        assert_eq!(Direction::X.index(), 0);
        assert_eq!(Direction::RZ.index(), 5);
        assert_eq!(Direction::from_index(4), Some(Direction::RY));
        assert_eq!(Direction::from_index(6), None);
        assert!(Direction::RX.is_rotation());
        assert!(!Direction::Z.is_rotation());
    }

    #[test]
    fn test_pinned_constraints() {
        let pinned = Constraint::pinned(7);
        assert_eq!(pinned.len(), 3);
        assert!(pinned.iter().all(|c| c.node == 7 && !c.is_prescribed()));
        assert!(pinned.iter().all(|c| !c.direction.is_rotation()));
    }

    #[test]
    fn test_prescribed_displacement() {
        let c = Constraint::new(1, Direction::Y, -0.01);
        assert!(c.is_prescribed());
        assert_eq!(Constraint::clamped(1).len(), 6);
    }
}
