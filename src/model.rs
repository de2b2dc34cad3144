//! Structure - the aggregate root owning every model entity by id

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisStep, Solver};
use crate::elements::{Constraint, Element, Material, Node, Property, Section};
use crate::error::{FEAError, FEAResult};
use crate::loads::Load;
use crate::math::Vec3;
use crate::results::{AnalysisSummary, NodeDisplacement, Reactions, StepReport};

/// A structural model: nodes, elements, properties, boundary conditions,
/// loads and the analysis steps to run on them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Structure {
    pub nodes: BTreeMap<usize, Node>,
    pub elements: BTreeMap<usize, Element>,
    pub materials: BTreeMap<usize, Material>,
    pub sections: BTreeMap<usize, Section>,
    pub properties: BTreeMap<usize, Property>,
    pub constraints: BTreeMap<usize, Constraint>,
    pub loads: BTreeMap<usize, Load>,
    pub steps: BTreeMap<usize, AnalysisStep>,
}

fn insert_unique<T>(
    map: &mut BTreeMap<usize, T>,
    collection: &'static str,
    id: usize,
    value: T,
) -> FEAResult<()> {
    if map.contains_key(&id) {
        return Err(FEAError::DuplicateId { collection, id });
    }
    map.insert(id, value);
    Ok(())
}

/// Smallest id above every id in use
fn next_id<T>(map: &BTreeMap<usize, T>) -> usize {
    map.keys().next_back().map_or(1, |id| id + 1)
}

impl Structure {
    /// Create a new empty model
    pub fn new() -> Self {
        Self::default()
    }

    // ========================
    // Model Building Methods
    // ========================

    pub fn add_node(&mut self, id: usize, node: Node) -> FEAResult<()> {
        insert_unique(&mut self.nodes, "node", id, node)
    }

    pub fn add_material(&mut self, id: usize, material: Material) -> FEAResult<()> {
        insert_unique(&mut self.materials, "material", id, material)
    }

    pub fn add_section(&mut self, id: usize, section: Section) -> FEAResult<()> {
        insert_unique(&mut self.sections, "section", id, section)
    }

    /// Id of the property pairing `material` and `section`, created on first use
    pub fn property(&mut self, material: usize, section: usize) -> FEAResult<usize> {
        if !self.materials.contains_key(&material) {
            return Err(FEAError::MaterialNotFound(material));
        }
        if !self.sections.contains_key(&section) {
            return Err(FEAError::SectionNotFound(section));
        }
        let wanted = Property::new(material, section);
        if let Some((id, _)) = self.properties.iter().find(|(_, p)| **p == wanted) {
            return Ok(*id);
        }
        let id = next_id(&self.properties);
        self.properties.insert(id, wanted);
        Ok(id)
    }

    /// Add an element after checking its nodes and property exist
    pub fn add_element(&mut self, id: usize, element: Element) -> FEAResult<()> {
        for node in element.nodes {
            if !self.nodes.contains_key(&node) {
                return Err(FEAError::NodeNotFound(node));
            }
        }
        if element.nodes[0] == element.nodes[1] {
            return Err(FEAError::InvalidGeometry(format!(
                "element {id} connects node {} to itself",
                element.nodes[0]
            )));
        }
        if !self.properties.contains_key(&element.property) {
            return Err(FEAError::PropertyNotFound(element.property));
        }
        insert_unique(&mut self.elements, "element", id, element)
    }

    pub fn add_constraint(&mut self, id: usize, constraint: Constraint) -> FEAResult<()> {
        if !self.nodes.contains_key(&constraint.node) {
            return Err(FEAError::NodeNotFound(constraint.node));
        }
        insert_unique(&mut self.constraints, "constraint", id, constraint)
    }

    /// Add several constraints with consecutive ids starting after the last one
    pub fn constrain(&mut self, constraints: impl IntoIterator<Item = Constraint>) -> FEAResult<()> {
        for constraint in constraints {
            let id = next_id(&self.constraints);
            self.add_constraint(id, constraint)?;
        }
        Ok(())
    }

    pub fn add_load(&mut self, id: usize, load: Load) -> FEAResult<()> {
        insert_unique(&mut self.loads, "load", id, load)
    }

    pub fn add_step(&mut self, id: usize, step: AnalysisStep) -> FEAResult<()> {
        insert_unique(&mut self.steps, "step", id, step)
    }

    // ========================
    // Lookups
    // ========================

    pub fn node(&self, id: usize) -> FEAResult<&Node> {
        self.nodes.get(&id).ok_or(FEAError::NodeNotFound(id))
    }

    pub fn node_mut(&mut self, id: usize) -> FEAResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(FEAError::NodeNotFound(id))
    }

    pub fn element(&self, id: usize) -> FEAResult<&Element> {
        self.elements.get(&id).ok_or(FEAError::ElementNotFound(id))
    }

    pub fn step(&self, id: usize) -> FEAResult<&AnalysisStep> {
        self.steps.get(&id).ok_or(FEAError::StepNotFound(id))
    }

    /// Material and section behind a property id
    pub fn property_data(&self, id: usize) -> FEAResult<(&Material, &Section)> {
        let property = self
            .properties
            .get(&id)
            .ok_or(FEAError::PropertyNotFound(id))?;
        let material = self
            .materials
            .get(&property.material)
            .ok_or(FEAError::MaterialNotFound(property.material))?;
        let section = self
            .sections
            .get(&property.section)
            .ok_or(FEAError::SectionNotFound(property.section))?;
        Ok((material, section))
    }

    /// Initial positions of an element's end nodes
    pub fn element_ends(&self, element: &Element) -> FEAResult<[Vec3; 2]> {
        Ok([
            self.node(element.nodes[0])?.position(),
            self.node(element.nodes[1])?.position(),
        ])
    }

    // ========================
    // State
    // ========================

    /// Check that every element connects existing nodes at distinct positions
    pub(crate) fn validate_elements(&self) -> FEAResult<()> {
        for element in self.elements.values() {
            element.reference_length(&self.element_ends(element)?)?;
        }
        Ok(())
    }

    /// Zero node kinematics and element results
    pub fn reset_state(&mut self) {
        for node in self.nodes.values_mut() {
            node.reset_state();
        }
        for element in self.elements.values_mut() {
            element.reset_state();
        }
    }

    /// Whether every element responds linearly to displacement
    pub fn is_linear(&self) -> bool {
        self.elements.values().all(Element::is_linear)
    }

    // ========================
    // Analysis
    // ========================

    /// Run every analysis step in ascending id order
    pub fn solve(&mut self) -> FEAResult<Vec<StepReport>> {
        Solver::new().run_all(self)
    }

    /// Run a single analysis step
    pub fn solve_step(&mut self, id: usize) -> FEAResult<StepReport> {
        Solver::new().run_step(self, id)
    }

    // ========================
    // Results
    // ========================

    pub fn node_displacement(&self, id: usize) -> FEAResult<NodeDisplacement> {
        let node = self.node(id)?;
        Ok(NodeDisplacement::from_array(std::array::from_fn(|i| {
            node.displacement.get(i).copied().unwrap_or(0.0)
        })))
    }

    /// Internal force accumulated at a node; at constrained DOFs this is
    /// the support reaction
    pub fn node_reactions(&self, id: usize) -> FEAResult<Reactions> {
        let node = self.node(id)?;
        Ok(Reactions::from_array(std::array::from_fn(|i| {
            node.force.get(i).copied().unwrap_or(0.0)
        })))
    }

    pub fn element_stress(&self, id: usize) -> FEAResult<f64> {
        Ok(self.element(id)?.stress())
    }

    /// Extreme values of the current state
    pub fn summary(&self) -> AnalysisSummary {
        let mut summary = AnalysisSummary {
            num_nodes: self.nodes.len(),
            num_elements: self.elements.len(),
            total_dofs: self.nodes.values().map(Node::num_dofs).sum(),
            ..AnalysisSummary::default()
        };
        for (id, node) in &self.nodes {
            let d = node.translation().norm();
            if summary.max_disp_node.is_none() || d > summary.max_displacement {
                summary.max_displacement = d;
                summary.max_disp_node = Some(*id);
            }
        }
        for (id, element) in &self.elements {
            let s = element.stress().abs();
            if summary.max_stress_element.is_none() || s > summary.max_stress {
                summary.max_stress = s;
                summary.max_stress_element = Some(*id);
            }
        }
        summary
    }

    // ========================
    // Serialization
    // ========================

    pub fn to_json(&self) -> FEAResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a structure, rejecting two properties for the same pair
    pub fn from_json(json: &str) -> FEAResult<Self> {
        let structure: Self = serde_json::from_str(json)?;
        let mut seen = BTreeMap::new();
        for (id, p) in &structure.properties {
            if let Some(first) = seen.insert((p.material, p.section), *id) {
                return Err(FEAError::InvalidInput(format!(
                    "properties {first} and {id} both pair material {} with section {}",
                    p.material, p.section
                )));
            }
        }
        Ok(structure)
    }
}
