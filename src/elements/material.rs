//! Material properties

use serde::{Deserialize, Serialize};

/// Isotropic linear-elastic material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Modulus of elasticity (Young's modulus)
    pub e: f64,
    /// Poisson's ratio
    pub nu: f64,
    /// Density
    pub rho: f64,
    /// Ultimate strength
    pub strength: f64,
    /// Coefficient of thermal expansion
    pub alpha: f64,
}

impl Material {
    /// Create a new material from E, nu and density
    pub fn new(e: f64, nu: f64, rho: f64) -> Self {
        Self {
            e,
            nu,
            rho,
            strength: 0.0,
            alpha: 0.0,
        }
    }

    /// Set the ultimate strength
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    /// Set the thermal expansion coefficient
    pub fn with_expansion(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Shear modulus G = E / (2 * (1 + nu))
    pub fn g(&self) -> f64 {
        self.e / (2.0 * (1.0 + self.nu))
    }

    /// Structural steel
    pub fn steel() -> Self {
        Self {
            e: 200e9,
            nu: 0.3,
            rho: 7850.0,
            strength: 250e6,
            alpha: 1.2e-5,
        }
    }

    /// Aluminum (6061-T6)
    pub fn aluminum() -> Self {
        Self {
            e: 68.9e9,
            nu: 0.33,
            rho: 2700.0,
            strength: 276e6,
            alpha: 2.3e-5,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::steel()
    }
}
