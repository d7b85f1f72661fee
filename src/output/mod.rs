//! Documents handed to the build phase
//!
//! - `group.toml` lists the resolved group: buildpacks under `[[group]]`,
//!   extensions under `[[group-extensions]]`
//! - `plan.toml` lists each required dependency with its providers

mod documents;

pub use documents::{
    write_result, GroupEntry, GroupFile, OutputError, PlanFile, PlanFileEntry, ProviderEntry,
};
