use crate::detect::{DetectResult, ResolvedGroup};
use crate::order::Reference;
use crate::plan::{BuildPlan, PlanEntry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: toml::ser::Error,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One line of `group.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub extension: bool,
}

impl From<&Reference> for GroupEntry {
    fn from(reference: &Reference) -> Self {
        Self {
            id: reference.id.clone(),
            version: reference.version.clone(),
            api: reference.api.clone(),
            homepage: reference.homepage.clone(),
            extension: reference.is_extension(),
        }
    }
}

/// The resolved group as the build phase reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFile {
    #[serde(default)]
    pub group: Vec<GroupEntry>,
    #[serde(default, rename = "group-extensions", skip_serializing_if = "Vec::is_empty")]
    pub group_extensions: Vec<GroupEntry>,
}

impl From<&ResolvedGroup> for GroupFile {
    fn from(resolved: &ResolvedGroup) -> Self {
        Self {
            group: resolved.group.iter().map(GroupEntry::from).collect(),
            group_extensions: resolved.group_extensions.iter().map(GroupEntry::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub extension: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFileEntry {
    pub providers: Vec<ProviderEntry>,
    pub requires: Vec<PlanEntry>,
}

/// The build plan: who provides each required dependency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanFile {
    #[serde(default)]
    pub entries: Vec<PlanFileEntry>,
}

impl From<&BuildPlan> for PlanFile {
    fn from(plan: &BuildPlan) -> Self {
        let entries = plan
            .entries
            .iter()
            .map(|entry| PlanFileEntry {
                providers: entry
                    .providers
                    .iter()
                    .map(|p| ProviderEntry {
                        id: p.id.clone(),
                        version: p.version.clone(),
                        extension: p.is_extension(),
                    })
                    .collect(),
                requires: entry.requires.clone(),
            })
            .collect();
        Self { entries }
    }
}

fn write_document<T: Serialize>(what: &'static str, value: &T, path: &Path) -> Result<(), OutputError> {
    let contents = toml::to_string(value).map_err(|source| OutputError::Serialize { what, source })?;

    let io_err = |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}

impl GroupFile {
    pub fn to_toml(&self) -> Result<String, OutputError> {
        toml::to_string(self).map_err(|source| OutputError::Serialize { what: "group", source })
    }

    pub fn write_toml(&self, path: &Path) -> Result<(), OutputError> {
        write_document("group", self, path)
    }
}

impl PlanFile {
    pub fn to_toml(&self) -> Result<String, OutputError> {
        toml::to_string(self).map_err(|source| OutputError::Serialize { what: "plan", source })
    }

    pub fn write_toml(&self, path: &Path) -> Result<(), OutputError> {
        write_document("plan", self, path)
    }
}

/// Writes both documents of a successful detection.
pub fn write_result(result: &DetectResult, group_path: &Path, plan_path: &Path) -> Result<(), OutputError> {
    GroupFile::from(&result.group).write_toml(group_path)?;
    PlanFile::from(&result.plan).write_toml(plan_path)
}
