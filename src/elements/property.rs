//! Material + section pairing shared by elements

use serde::{Deserialize, Serialize};

/// A deduplicated pairing of one material and one section.
///
/// Created through `Structure::property`, which never produces two
/// properties for the same (material, section) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Material id
    pub material: usize,
    /// Section id
    pub section: usize,
}

impl Property {
    pub fn new(material: usize, section: usize) -> Self {
        Self { material, section }
    }
}
