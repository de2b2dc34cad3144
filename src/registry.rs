//! Registry of structures owned by a hosting application

use std::collections::BTreeMap;

use log::{debug, info};

use crate::error::{FEAError, FEAResult};
use crate::model::Structure;
use crate::results::StepReport;

/// Structures keyed by id with one of them marked active.
///
/// Ids are never reused while the registry lives; `clear` starts over.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<usize, Structure>,
    active: Option<usize>,
    next_id: usize,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a structure and make it the active one
    pub fn create(&mut self, structure: Structure) -> usize {
        self.next_id += 1;
        let id = self.next_id;
        self.models.insert(id, structure);
        self.active = Some(id);
        info!("registered model {id}");
        id
    }

    pub fn get(&self, id: usize) -> FEAResult<&Structure> {
        self.models.get(&id).ok_or(FEAError::ModelNotFound(id))
    }

    pub fn get_mut(&mut self, id: usize) -> FEAResult<&mut Structure> {
        self.models.get_mut(&id).ok_or(FEAError::ModelNotFound(id))
    }

    pub fn active_id(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&Structure> {
        self.active.and_then(|id| self.models.get(&id))
    }

    pub fn active_mut(&mut self) -> Option<&mut Structure> {
        self.active.and_then(|id| self.models.get_mut(&id))
    }

    pub fn set_active(&mut self, id: usize) -> FEAResult<()> {
        if !self.models.contains_key(&id) {
            return Err(FEAError::ModelNotFound(id));
        }
        self.active = Some(id);
        Ok(())
    }

    /// Remove a structure. Deleting the active one activates the lowest
    /// remaining id.
    pub fn delete(&mut self, id: usize) -> FEAResult<Structure> {
        let structure = self.models.remove(&id).ok_or(FEAError::ModelNotFound(id))?;
        if self.active == Some(id) {
            self.active = self.models.keys().next().copied();
            debug!("model {id} deleted, active model is now {:?}", self.active);
        }
        Ok(structure)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn ids(&self) -> Vec<usize> {
        self.models.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Run every step of the active structure
    pub fn solve_active(&mut self) -> FEAResult<Vec<StepReport>> {
        self.active_mut().ok_or(FEAError::NoStructure)?.solve()
    }
}
