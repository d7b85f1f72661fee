//! Buildpack and extension descriptor lookup.

mod descriptor;
mod dir;
mod memory;

pub use descriptor::{Descriptor, DescriptorInfo};
pub use dir::{escape_id, DirStore};
pub use memory::MemoryStore;

use crate::order::Kind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id}@{version} not found")]
    NotFound {
        kind: Kind,
        id: String,
        version: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed descriptor {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("descriptor {path} declares id '{found}', expected '{expected}'")]
    Mismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

/// Source of descriptors. Implementations are read-only and may be called
/// from several probes at once.
pub trait DescriptorStore: Send + Sync {
    fn lookup(&self, id: &str, version: &str, kind: Kind) -> Result<Descriptor, StoreError>;
}

impl<T: DescriptorStore + ?Sized> DescriptorStore for std::sync::Arc<T> {
    fn lookup(&self, id: &str, version: &str, kind: Kind) -> Result<Descriptor, StoreError> {
        (**self).lookup(id, version, kind)
    }
}
