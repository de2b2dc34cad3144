//! Result types for FEA analysis

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::elements::Node;

/// Frames closer together than this are considered the same time
const TIME_EPSILON: f64 = 1e-10;

/// Displacement results at a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDisplacement {
    /// Displacement in X direction
    pub dx: f64,
    /// Displacement in Y direction
    pub dy: f64,
    /// Displacement in Z direction
    pub dz: f64,
    /// Rotation about X axis
    pub rx: f64,
    /// Rotation about Y axis
    pub ry: f64,
    /// Rotation about Z axis
    pub rz: f64,
}

impl NodeDisplacement {
    /// Create from array [DX, DY, DZ, RX, RY, RZ]
    pub fn from_array(arr: [f64; 6]) -> Self {
        Self {
            dx: arr[0],
            dy: arr[1],
            dz: arr[2],
            rx: arr[3],
            ry: arr[4],
            rz: arr[5],
        }
    }
}

/// Nodal force (reaction at constrained DOFs)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reactions {
    /// Reaction force in X direction
    pub fx: f64,
    /// Reaction force in Y direction
    pub fy: f64,
    /// Reaction force in Z direction
    pub fz: f64,
    /// Reaction moment about X axis
    pub mx: f64,
    /// Reaction moment about Y axis
    pub my: f64,
    /// Reaction moment about Z axis
    pub mz: f64,
}

impl Reactions {
    /// Create from array [FX, FY, FZ, MX, MY, MZ]
    pub fn from_array(arr: [f64; 6]) -> Self {
        Self {
            fx: arr[0],
            fy: arr[1],
            fz: arr[2],
            mx: arr[3],
            my: arr[4],
            mz: arr[5],
        }
    }
}

/// Quantity selector for recorded node results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    U1,
    U2,
    U3,
    UMagnitude,
    V1,
    V2,
    V3,
    A1,
    A2,
    A3,
    UR1,
    UR2,
    UR3,
    F1,
    F2,
    F3,
    M1,
    M2,
    M3,
}

impl Field {
    /// Column label used when printing histories
    pub fn name(self) -> &'static str {
        match self {
            Field::U1 => "U1",
            Field::U2 => "U2",
            Field::U3 => "U3",
            Field::UMagnitude => "U",
            Field::V1 => "V1",
            Field::V2 => "V2",
            Field::V3 => "V3",
            Field::A1 => "A1",
            Field::A2 => "A2",
            Field::A3 => "A3",
            Field::UR1 => "UR1",
            Field::UR2 => "UR2",
            Field::UR3 => "UR3",
            Field::F1 => "F1",
            Field::F2 => "F2",
            Field::F3 => "F3",
            Field::M1 => "M1",
            Field::M2 => "M2",
            Field::M3 => "M3",
        }
    }
}

/// Snapshot of one node's kinematic state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub displacement: [f64; 6],
    pub velocity: [f64; 3],
    pub acceleration: [f64; 3],
    pub force: [f64; 6],
}

fn copy_into<const N: usize>(dst: &mut [f64; N], src: &[f64]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = *s;
    }
}

impl NodeRecord {
    /// Read the current state of a node
    pub fn from_node(node: &Node) -> Self {
        let mut record = Self::default();
        copy_into(&mut record.displacement, &node.displacement);
        copy_into(&mut record.velocity, &node.velocity);
        copy_into(&mut record.acceleration, &node.acceleration);
        copy_into(&mut record.force, &node.force);
        record
    }

    pub fn value(&self, field: Field) -> f64 {
        let u = &self.displacement;
        match field {
            Field::U1 => u[0],
            Field::U2 => u[1],
            Field::U3 => u[2],
            Field::UMagnitude => (u[0] * u[0] + u[1] * u[1] + u[2] * u[2]).sqrt(),
            Field::V1 => self.velocity[0],
            Field::V2 => self.velocity[1],
            Field::V3 => self.velocity[2],
            Field::A1 => self.acceleration[0],
            Field::A2 => self.acceleration[1],
            Field::A3 => self.acceleration[2],
            Field::UR1 => u[3],
            Field::UR2 => u[4],
            Field::UR3 => u[5],
            Field::F1 => self.force[0],
            Field::F2 => self.force[1],
            Field::F3 => self.force[2],
            Field::M1 => self.force[3],
            Field::M2 => self.force[4],
            Field::M3 => self.force[5],
        }
    }
}

/// State of every node at one time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub time: f64,
    pub nodes: BTreeMap<usize, NodeRecord>,
}

impl Frame {
    pub fn capture<'a>(time: f64, nodes: impl IntoIterator<Item = (&'a usize, &'a Node)>) -> Self {
        Self {
            time,
            nodes: nodes
                .into_iter()
                .map(|(id, node)| (*id, NodeRecord::from_node(node)))
                .collect(),
        }
    }

    /// Value of a field at a node; 0 when the node was not recorded
    pub fn value(&self, node: usize, field: Field) -> f64 {
        self.nodes.get(&node).map_or(0.0, |r| r.value(field))
    }
}

/// Ordered collection of result frames for one analysis step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outputter {
    frames: Vec<Frame>,
}

impl Outputter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the nodes at `time`; replaces an existing frame at the same time
    pub fn record<'a>(
        &mut self,
        time: f64,
        nodes: impl IntoIterator<Item = (&'a usize, &'a Node)>,
    ) {
        self.push(Frame::capture(time, nodes));
    }

    /// Append a frame; replaces an existing frame at the same time
    pub fn push(&mut self, frame: Frame) {
        match self
            .frames
            .iter_mut()
            .find(|f| (f.time - frame.time).abs() < TIME_EPSILON)
        {
            Some(existing) => *existing = frame,
            None => self.frames.push(frame),
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// (time, value) pairs of one field at one node across all frames
    pub fn history(&self, node: usize, field: Field) -> Vec<(f64, f64)> {
        self.frames
            .iter()
            .map(|f| (f.time, f.value(node, field)))
            .collect()
    }
}

/// Outcome of one static load increment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncrementReport {
    /// Load factor applied to current-step loads
    pub factor: f64,
    /// Newton-Raphson iterations performed
    pub iterations: usize,
    /// Residual norm at the end of the increment
    pub residual: f64,
    pub converged: bool,
}

/// Outcome of one analysis step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: usize,
    pub num_fixed: usize,
    pub num_free: usize,
    /// Static increments (empty for dynamic steps)
    pub increments: Vec<IncrementReport>,
    /// Accepted time steps (dynamic steps only)
    pub time_steps: usize,
    /// Final analysis time reached
    pub final_time: f64,
}

impl StepReport {
    /// True when every increment met the tolerance
    pub fn converged(&self) -> bool {
        self.increments.iter().all(|i| i.converged)
    }

    /// Total Newton-Raphson iterations across increments
    pub fn total_iterations(&self) -> usize {
        self.increments.iter().map(|i| i.iterations).sum()
    }
}

/// Summary of analysis results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Maximum translation magnitude
    pub max_displacement: f64,
    /// Node with maximum displacement
    pub max_disp_node: Option<usize>,
    /// Largest absolute element stress
    pub max_stress: f64,
    /// Element with the largest stress
    pub max_stress_element: Option<usize>,
    /// Total number of nodes
    pub num_nodes: usize,
    /// Total number of elements
    pub num_elements: usize,
    /// Total DOFs
    pub total_dofs: usize,
}
