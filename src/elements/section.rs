//! Cross-section properties for line elements

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Geometric definition a section was built from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SectionShape {
    /// Solid circle
    Circular { radius: f64 },
    /// Solid rectangle
    Rectangular { width: f64, depth: f64 },
    /// Properties given directly
    General,
}

/// Cross-section properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Shape the properties were derived from
    pub shape: SectionShape,
    /// Cross-sectional area
    pub a: f64,
    /// Moment of inertia about local y-axis
    pub iy: f64,
    /// Moment of inertia about local z-axis
    pub iz: f64,
    /// Torsional constant
    pub j: f64,
}

impl Section {
    /// Create a section with explicit properties
    pub fn new(a: f64, iy: f64, iz: f64, j: f64) -> Self {
        Self {
            shape: SectionShape::General,
            a,
            iy,
            iz,
            j,
        }
    }

    /// Section carrying only an area (truss and cable elements)
    pub fn area(a: f64) -> Self {
        Self::new(a, 0.0, 0.0, 0.0)
    }

    /// Create a solid circular section from its radius
    pub fn circular(radius: f64) -> Self {
        let i = PI * radius.powi(4) / 4.0;
        Self {
            shape: SectionShape::Circular { radius },
            a: PI * radius.powi(2),
            iy: i,
            iz: i,
            j: 2.0 * i,
        }
    }

    /// Create a rectangular section
    pub fn rectangular(width: f64, depth: f64) -> Self {
        let iy = width * depth.powi(3) / 12.0;
        let iz = depth * width.powi(3) / 12.0;

        // Torsional constant for rectangle (approximate)
        let (a_dim, b_dim) = if width > depth { (width, depth) } else { (depth, width) };
        let j = a_dim * b_dim.powi(3) / 3.0 * (1.0 - 0.63 * b_dim / a_dim);

        Self {
            shape: SectionShape::Rectangular { width, depth },
            a: width * depth,
            iy,
            iz,
            j,
        }
    }

    /// Get the area
    pub fn area_value(&self) -> f64 {
        self.a
    }

    /// Get the polar moment of inertia
    pub fn ip(&self) -> f64 {
        self.iy + self.iz
    }
}
