//! Build plan data: what detect probes declare and what the solver produces.

use crate::order::Reference;
use serde::{Deserialize, Serialize};

/// A `[[requires]]` entry. Metadata is opaque to the engine and carried
/// through unmodified for the build phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub name: String,
    /// Deprecated top-level version key, folded into `metadata.version`
    /// once the plan is validated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub metadata: toml::Table,
}

impl PlanEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn has_top_level_version(&self) -> bool {
        self.version.as_deref().is_some_and(|v| !v.is_empty())
    }

    pub fn has_doubly_specified_version(&self) -> bool {
        self.has_top_level_version() && self.metadata.contains_key("version")
    }

    /// Moves a top-level `version` into `metadata.version`.
    pub fn convert_version_to_metadata(&mut self) {
        if let Some(version) = self.version.take() {
            if !version.is_empty() {
                self.metadata
                    .insert("version".to_string(), toml::Value::String(version));
            }
        }
    }
}

/// A `[[provides]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provide {
    pub name: String,
}

impl Provide {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One provides/requires alternative of a detect plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSections {
    #[serde(default)]
    pub provides: Vec<Provide>,
    #[serde(default)]
    pub requires: Vec<PlanEntry>,
}

impl PlanSections {
    pub fn provides<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides.extend(names.into_iter().map(Provide::new));
        self
    }

    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(PlanEntry::new));
        self
    }

    pub fn with_require(mut self, entry: PlanEntry) -> Self {
        self.requires.push(entry);
        self
    }

    pub fn provides_name(&self, name: &str) -> bool {
        self.provides.iter().any(|p| p.name == name)
    }
}

/// The plan a detect probe writes: a primary section plus `[[or]]` alternatives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectPlan {
    #[serde(default)]
    pub provides: Vec<Provide>,
    #[serde(default)]
    pub requires: Vec<PlanEntry>,
    #[serde(default)]
    pub or: Vec<PlanSections>,
}

impl DetectPlan {
    pub fn new(primary: PlanSections) -> Self {
        Self {
            provides: primary.provides,
            requires: primary.requires,
            or: Vec::new(),
        }
    }

    pub fn or(mut self, alternative: PlanSections) -> Self {
        self.or.push(alternative);
        self
    }

    /// Primary section first, then each alternative in declaration order.
    pub fn options(&self) -> Vec<PlanSections> {
        let mut options = Vec::with_capacity(self.or.len() + 1);
        options.push(PlanSections {
            provides: self.provides.clone(),
            requires: self.requires.clone(),
        });
        options.extend(self.or.iter().cloned());
        options
    }

    fn all_requires(&self) -> impl Iterator<Item = &PlanEntry> {
        self.requires
            .iter()
            .chain(self.or.iter().flat_map(|s| s.requires.iter()))
    }

    pub fn has_requires(&self) -> bool {
        self.all_requires().next().is_some()
    }

    pub fn has_doubly_specified_versions(&self) -> bool {
        self.all_requires().any(PlanEntry::has_doubly_specified_version)
    }

    pub fn has_top_level_versions(&self) -> bool {
        self.all_requires().any(PlanEntry::has_top_level_version)
    }

    pub fn convert_versions_to_metadata(&mut self) {
        for entry in self.requires.iter_mut() {
            entry.convert_version_to_metadata();
        }
        for section in self.or.iter_mut() {
            for entry in section.requires.iter_mut() {
                entry.convert_version_to_metadata();
            }
        }
    }
}

/// One solved dependency: who provides it and what each requirer asked for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildPlanEntry {
    pub name: String,
    pub providers: Vec<Reference>,
    pub requires: Vec<PlanEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildPlan {
    pub entries: Vec<BuildPlanEntry>,
}

impl BuildPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, name: &str) -> Option<&BuildPlanEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}
