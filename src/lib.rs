//! FEA Engine - nonlinear structural analysis of line-element models
//!
//! The engine computes equilibrium of truss, cable and beam structures:
//! - DOF numbering with constrained DOFs first
//! - Sparse assembly of the partitioned tangent stiffness
//! - Incremental Newton-Raphson static steps with geometric nonlinearity
//! - Newmark-beta dynamic steps with step-doubling error control
//!
//! ## Example
//! ```rust
//! use fea_engine::prelude::*;
//!
//! let mut model = Structure::new();
//! model.add_node(1, Node::new(0.0, 0.0, 0.0)).unwrap();
//! model.add_node(2, Node::new(2.0, 0.0, 0.0)).unwrap();
//! model.add_material(1, Material::new(1000.0, 0.3, 1.0)).unwrap();
//! model.add_section(1, Section::area(0.5)).unwrap();
//! let property = model.property(1, 1).unwrap();
//! model.add_element(1, Element::truss(1, 2, property)).unwrap();
//!
//! model.constrain(Constraint::pinned(1)).unwrap();
//! model
//!     .constrain([
//!         Constraint::fixed(2, Direction::Y),
//!         Constraint::fixed(2, Direction::Z),
//!     ])
//!     .unwrap();
//! model.add_load(1, Load::node_force(2, Direction::X, 10.0, 1)).unwrap();
//! model.add_step(1, AnalysisStep::static_step(1.0, 0.25)).unwrap();
//!
//! let reports = model.solve().unwrap();
//! assert!(reports[0].converged());
//! let dx = model.node_displacement(2).unwrap().dx;
//! assert!(dx > 0.0);
//! ```

pub mod analysis;
pub mod dynamics;
pub mod elements;
pub mod error;
pub mod loads;
pub mod math;
pub mod model;
pub mod registry;
pub mod results;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::{Amplitude, AnalysisStep, Solver, StepType};
    pub use crate::dynamics::{DynamicModel, GeneralModel, LinearModel, Newmark, NewmarkParameters, State};
    pub use crate::elements::{
        Constraint, Direction, Element, ElementKind, Material, Node, Section, StrainMeasure,
    };
    pub use crate::error::{FEAError, FEAResult};
    pub use crate::loads::Load;
    pub use crate::model::Structure;
    pub use crate::registry::ModelRegistry;
    pub use crate::results::{Field, Frame, NodeDisplacement, Outputter, Reactions, StepReport};
}
