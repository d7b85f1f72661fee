//! buildpack-detect - the detect phase of a Cloud Native Buildpacks platform
//!
//! Given an application directory and an order of buildpack groups, this
//! library runs each buildpack's detect probe and selects the first group
//! whose members all pass (or are optional) and whose requirements are met
//! by what the group provides.
//!
//! # Core Concepts
//!
//! - **Descriptor store**: Looks up `buildpack.toml` / `extension.toml` by id
//!   and version
//! - **Probe**: One run of `bin/detect`, yielding pass, fail or an error plus
//!   the module's declared build plan
//! - **Group evaluation**: Probes a group concurrently and solves the plan
//!   across its `[[or]]` alternatives
//! - **Order resolution**: Expands composite buildpacks and tries candidate
//!   groups in priority order
//!
//! # Example Usage
//!
//! ```no_run
//! use buildpack_detect::detect::{GroupEvaluator, OrderResolver};
//! use buildpack_detect::env::BuildEnv;
//! use buildpack_detect::order::OrderDocument;
//! use buildpack_detect::probe::{ProbeInputs, ProcessProbeRunner};
//! use buildpack_detect::store::DirStore;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let document = OrderDocument::read("/cnb/order.toml".as_ref())?;
//! let evaluator = GroupEvaluator::new(
//!     Arc::new(DirStore::new("/cnb/buildpacks")),
//!     Arc::new(ProcessProbeRunner::default()),
//!     ProbeInputs::new("/workspace", "/platform", BuildEnv::from_process()),
//! );
//!
//! let result = OrderResolver::new(evaluator)
//!     .resolve_document(&CancellationToken::new(), &document)
//!     .await?;
//! println!("Detected: {:?}", result.group.ids());
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`api`]: Buildpack API versions and compatibility checks
//! - [`order`]: Orders, groups and composite expansion
//! - [`store`]: Descriptor lookup
//! - [`probe`]: Running and validating detect probes
//! - [`detect`]: Group evaluation, plan solving and order resolution
//! - [`output`]: `group.toml` and `plan.toml`

pub mod api;
pub mod cli;
pub mod config;
pub mod detect;
pub mod env;
pub mod order;
pub mod output;
pub mod plan;
pub mod probe;
pub mod progress;
pub mod store;
pub mod util;

pub use api::{ApiError, ApiSet, ApiVersion, DeprecationMode};
pub use config::{ConfigError, DetectorConfig};
pub use detect::{DetectError, DetectResult, FatalPolicy, GroupEvaluator, OrderResolver};
pub use order::{Group, Order, OrderDocument, Reference};
pub use probe::{DetectionOutcome, ProbeRunner, ProcessProbeRunner};
pub use store::{Descriptor, DescriptorStore, DirStore};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_buildpack_detect() {
        assert_eq!(NAME, "buildpack-detect");
    }
}
