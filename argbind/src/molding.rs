//! Structured value molding.
//!
//! A [`Molder`] materializes an instance of a structured Rust type from a
//! decoded JSON document. The engine asks the [`MoldingRegistry`] whether a
//! type is claimed when classifying parameters and again at call time to
//! decode JSON payloads.

use crate::annotation::StructType;
use crate::value::Instance;
use serde::de::DeserializeOwned;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Molding failures.
#[derive(Debug, Error)]
pub enum MoldError {
    /// No molder claims the type.
    #[error("No molder can structure type '{0}'")]
    Unsupported(&'static str),

    /// The document does not fit the type.
    #[error("Cannot structure '{type_name}': {source}")]
    Decode {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Materializes structured values from JSON.
pub trait Molder: Send + Sync {
    /// Whether this molder can build instances of `ty`.
    fn is_type_structure(&self, ty: &StructType) -> bool;

    /// Build an instance of `ty` from a decoded document.
    fn encode(&self, ty: &StructType, json: serde_json::Value) -> Result<Instance, MoldError>;
}

/// Ordered set of molders; the first one claiming a type handles it.
#[derive(Clone, Default)]
pub struct MoldingRegistry {
    molders: Vec<Arc<dyn Molder>>,
}

impl MoldingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a molder, builder style.
    pub fn with(mut self, molder: impl Molder + 'static) -> Self {
        self.register(molder);
        self
    }

    pub fn register(&mut self, molder: impl Molder + 'static) {
        self.molders.push(Arc::new(molder));
    }

    pub fn claims(&self, ty: &StructType) -> bool {
        self.molders.iter().any(|m| m.is_type_structure(ty))
    }

    pub fn encode(&self, ty: &StructType, json: serde_json::Value) -> Result<Instance, MoldError> {
        match self.molders.iter().find(|m| m.is_type_structure(ty)) {
            Some(molder) => molder.encode(ty, json),
            None => Err(MoldError::Unsupported(ty.name)),
        }
    }

    pub fn len(&self) -> usize {
        self.molders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molders.is_empty()
    }
}

type Decoder = Arc<dyn Fn(serde_json::Value) -> Result<Instance, serde_json::Error> + Send + Sync>;

/// Molder backed by `serde` for explicitly listed types.
#[derive(Clone, Default)]
pub struct SerdeMolder {
    decoders: HashMap<TypeId, Decoder>,
}

impl SerdeMolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `T`.
    pub fn with<T>(mut self) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.decoders.insert(
            TypeId::of::<T>(),
            Arc::new(|json| serde_json::from_value::<T>(json).map(Instance::new)),
        );
        self
    }
}

impl Molder for SerdeMolder {
    fn is_type_structure(&self, ty: &StructType) -> bool {
        self.decoders.contains_key(&ty.id)
    }

    fn encode(&self, ty: &StructType, json: serde_json::Value) -> Result<Instance, MoldError> {
        let decode = self.decoders.get(&ty.id).ok_or(MoldError::Unsupported(ty.name))?;
        decode(json).map_err(|source| MoldError::Decode {
            type_name: ty.name,
            source,
        })
    }
}
