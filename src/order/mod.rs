//! Orders, groups and group elements.
//!
//! An [`Order`] is a prioritised list of [`Group`]s. A group holds
//! [`GroupElement`]s, each either a [`Reference`] to a buildpack or extension,
//! or a nested order that must be expanded (see [`flatten`]) before the group
//! can be evaluated.

mod expand;
mod file;
mod types;

pub use expand::flatten;
pub use file::OrderDocument;
pub(crate) use file::{order_from_toml, GroupToml};
pub use types::{prepend_extensions, Group, GroupElement, Kind, ModuleKey, Order, Reference};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("failed to read order file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed order file {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("malformed order: {0}")]
    Parse(String),

    #[error("composite buildpack {0} includes itself")]
    CompositeCycle(String),
}
