//! Per-invocation shared state cache.

use crate::annotation::SharedType;
use crate::value::Instance;
use crate::CliResult;
use std::any::TypeId;
use std::collections::HashMap;
use tracing::debug;

/// One instance per shared state type, built on first use.
///
/// Each invocation owns its cache; it is dropped when the invocation ends.
#[derive(Debug, Default)]
pub struct StateCache {
    instances: HashMap<TypeId, Instance>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached instance of `ty`, constructing it if needed.
    pub fn get_or_construct(&mut self, ty: &SharedType) -> CliResult<Instance> {
        if let Some(instance) = self.instances.get(&ty.id) {
            return Ok(instance.clone());
        }
        debug!(state = ty.name, "Constructing shared state");
        let instance = ty.construct()?;
        self.instances.insert(ty.id, instance.clone());
        Ok(instance)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
