//! DOF numbering with the constrained block first

use log::{debug, warn};

use crate::error::{FEAError, FEAResult};
use crate::model::Structure;

/// Sizes of the fixed and free DOF blocks.
///
/// Global indices `0..num_fixed` are constrained, `num_fixed..total()` free.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DofPartition {
    pub num_fixed: usize,
    pub num_free: usize,
}

impl DofPartition {
    pub fn total(&self) -> usize {
        self.num_fixed + self.num_free
    }

    pub fn is_fixed(&self, index: usize) -> bool {
        index < self.num_fixed
    }

    /// Position of a global index inside the free block
    pub fn free_index(&self, index: usize) -> Option<usize> {
        index.checked_sub(self.num_fixed)
    }
}

/// Number every DOF of the structure.
///
/// Nodes are sized by their incident elements, constrained directions are
/// numbered first in constraint id order, then the remaining DOFs in node id
/// order. Previous numbering is discarded.
pub fn number_dofs(structure: &mut Structure) -> FEAResult<DofPartition> {
    for node in structure.nodes.values_mut() {
        node.reset_dofs();
    }

    for (id, element) in &structure.elements {
        for node_id in element.nodes {
            let node = structure
                .nodes
                .get_mut(&node_id)
                .ok_or(FEAError::NodeNotFound(node_id))?;
            node.ensure_dofs(element.dofs_per_node());
        }
        debug!("element {id} sized its nodes to {} DOFs", element.dofs_per_node());
    }

    let mut next = 0;
    for (id, constraint) in &structure.constraints {
        let Some(node) = structure.nodes.get_mut(&constraint.node) else {
            warn!("constraint {id} references missing node {}, skipped", constraint.node);
            continue;
        };
        let slot = constraint.direction.index();
        match node.dofs.get_mut(slot) {
            Some(dof) if dof.is_none() => {
                *dof = Some(next);
                next += 1;
            }
            Some(_) => {}
            None => debug!(
                "constraint {id} on {:?} ignored: node {} owns {} DOFs",
                constraint.direction,
                constraint.node,
                node.num_dofs()
            ),
        }
    }
    let num_fixed = next;

    for node in structure.nodes.values_mut() {
        for dof in node.dofs.iter_mut().filter(|d| d.is_none()) {
            *dof = Some(next);
            next += 1;
        }
    }

    Ok(DofPartition {
        num_fixed,
        num_free: next - num_fixed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Constraint, Direction, Element, Material, Node, Section};

    fn frame() -> Structure {
        let mut s = Structure::new();
        s.add_node(1, Node::new(0.0, 0.0, 0.0)).unwrap();
        s.add_node(2, Node::new(1.0, 0.0, 0.0)).unwrap();
        s.add_node(3, Node::new(1.0, 1.0, 0.0)).unwrap();
        s.add_node(4, Node::new(5.0, 5.0, 5.0)).unwrap();
        s.add_material(1, Material::steel()).unwrap();
        s.add_section(1, Section::rectangular(0.1, 0.2)).unwrap();
        let p = s.property(1, 1).unwrap();
        s.add_element(1, Element::truss(1, 2, p)).unwrap();
        s.add_element(2, Element::beam(2, 3, p)).unwrap();
        for (i, c) in Constraint::pinned(1).into_iter().enumerate() {
            s.add_constraint(10 + i, c).unwrap();
        }
        s.add_constraint(20, Constraint::fixed(3, Direction::RZ)).unwrap();
        // rotation on a truss-only node: not owned, ignored
        s.add_constraint(21, Constraint::fixed(1, Direction::RX)).unwrap();
        s
    }

    #[test]
    fn test_partition_counts() {
        let mut s = frame();
        let p = number_dofs(&mut s).unwrap();

        let total: usize = s.nodes.values().map(|n| n.num_dofs()).sum();
        assert_eq!(p.total(), total);
        assert_eq!(total, 3 + 6 + 6);
        assert_eq!(p.num_fixed, 4);
        assert_eq!(s.node(4).unwrap().num_dofs(), 0);

        for c in s.constraints.values() {
            if let Some(idx) = s.node(c.node).unwrap().dof(c.direction) {
                assert!(p.is_fixed(idx));
            }
        }
        assert_eq!(s.node(3).unwrap().dof(Direction::RZ), Some(3));
        assert_eq!(s.node(2).unwrap().dof(Direction::X), Some(4));
    }

    #[test]
    fn test_renumbering_is_idempotent() {
        let mut s = frame();
        let first = number_dofs(&mut s).unwrap();
        let dofs: Vec<_> = s.nodes.values().map(|n| n.dofs().to_vec()).collect();

        let second = number_dofs(&mut s).unwrap();
        let again: Vec<_> = s.nodes.values().map(|n| n.dofs().to_vec()).collect();
        assert_eq!(first, second);
        assert_eq!(dofs, again);
    }

    #[test]
    fn test_free_index() {
        let p = DofPartition {
            num_fixed: 3,
            num_free: 2,
        };
        assert_eq!(p.free_index(4), Some(1));
        assert_eq!(p.free_index(1), None);
        assert!(!p.is_fixed(3));
    }
}
