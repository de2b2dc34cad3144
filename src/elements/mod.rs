//! Structural elements module

mod constraint;
mod element;
mod material;
mod node;
mod property;
mod section;

pub use constraint::{Constraint, Direction};
pub use element::{Element, ElementKind, ElementResponse, StrainMeasure};
pub use material::Material;
pub use node::Node;
pub use property::Property;
pub use section::{Section, SectionShape};
