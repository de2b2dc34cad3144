//! Load types and their activation per analysis step

use serde::{Deserialize, Serialize};

use crate::elements::Direction;

/// Standard gravitational acceleration (negative: acts downwards)
pub const STANDARD_GRAVITY: f64 = -9.80665;

/// A load bound to the analysis step in which it is introduced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Load {
    /// Concentrated force (or moment) at a node
    NodeForce {
        node: usize,
        direction: Direction,
        value: f64,
        step: usize,
    },
    /// Uniform force per unit reference length along an element, split
    /// equally between its end nodes
    ElementForce {
        element: usize,
        direction: Direction,
        value: f64,
        step: usize,
    },
    /// Acceleration applied to the lumped mass of every element
    Gravity {
        direction: Direction,
        value: f64,
        step: usize,
    },
}

/// How a load participates in a given step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadActivity {
    /// Introduced by an earlier step: full magnitude
    Applied,
    /// Introduced by the current step: scaled by the increment factor
    Ramping,
    /// Introduced by a later step: ignored
    Inactive,
}

impl LoadActivity {
    pub fn of(load_step: usize, current_step: usize) -> Self {
        use std::cmp::Ordering;
        match load_step.cmp(&current_step) {
            Ordering::Less => LoadActivity::Applied,
            Ordering::Equal => LoadActivity::Ramping,
            Ordering::Greater => LoadActivity::Inactive,
        }
    }

    /// Multiplier for a load given the current increment factor
    pub fn scale(self, factor: f64) -> f64 {
        match self {
            LoadActivity::Applied => 1.0,
            LoadActivity::Ramping => factor,
            LoadActivity::Inactive => 0.0,
        }
    }
}

impl Load {
    pub fn node_force(node: usize, direction: Direction, value: f64, step: usize) -> Self {
        Load::NodeForce {
            node,
            direction,
            value,
            step,
        }
    }

    pub fn element_force(element: usize, direction: Direction, value: f64, step: usize) -> Self {
        Load::ElementForce {
            element,
            direction,
            value,
            step,
        }
    }

    /// Standard gravity along -Y
    pub fn gravity(step: usize) -> Self {
        Load::Gravity {
            direction: Direction::Y,
            value: STANDARD_GRAVITY,
            step,
        }
    }

    /// Step in which the load is introduced
    pub fn step(&self) -> usize {
        match self {
            Load::NodeForce { step, .. }
            | Load::ElementForce { step, .. }
            | Load::Gravity { step, .. } => *step,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Load::NodeForce { direction, .. }
            | Load::ElementForce { direction, .. }
            | Load::Gravity { direction, .. } => *direction,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Load::NodeForce { value, .. }
            | Load::ElementForce { value, .. }
            | Load::Gravity { value, .. } => *value,
        }
    }

    /// Effective multiplier of this load during `current_step`
    pub fn factor(&self, current_step: usize, increment_factor: f64) -> f64 {
        LoadActivity::of(self.step(), current_step).scale(increment_factor)
    }
}
