use super::StoreError;
use crate::order::{order_from_toml, GroupToml, Kind, Order, Reference};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DescriptorInfo {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub homepage: Option<String>,
    /// Run the probe with the base environment only, skipping the platform overlay.
    #[serde(default, rename = "clear-env")]
    pub clear_env: bool,
}

/// A parsed `buildpack.toml` or `extension.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub api: String,
    pub kind: Kind,
    pub info: DescriptorInfo,
    /// Non-empty for composite buildpacks.
    pub order: Order,
    pub root_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct DescriptorToml {
    #[serde(default)]
    api: String,
    buildpack: Option<DescriptorInfo>,
    extension: Option<DescriptorInfo>,
    #[serde(default)]
    order: Vec<GroupToml>,
}

impl Descriptor {
    pub fn new(kind: Kind, api: impl Into<String>, info: DescriptorInfo, root_dir: PathBuf) -> Self {
        Self {
            api: api.into(),
            kind,
            info,
            order: Order::default(),
            root_dir,
        }
    }

    /// Parses descriptor contents found at `path`; the root directory is its parent.
    pub fn parse(contents: &str, kind: Kind, path: &Path) -> Result<Self, StoreError> {
        let malformed = |message: String| StoreError::Malformed {
            path: path.to_path_buf(),
            message,
        };

        let raw: DescriptorToml = toml::from_str(contents).map_err(|e| malformed(e.to_string()))?;

        let info = match kind {
            Kind::Buildpack => raw.buildpack,
            Kind::Extension => raw.extension,
        }
        .ok_or_else(|| malformed(format!("missing [{}] table", kind)))?;

        if info.id.trim().is_empty() {
            return Err(malformed(format!("{} id is empty", kind)));
        }

        if kind == Kind::Extension && !raw.order.is_empty() {
            return Err(malformed("extensions cannot declare an order".to_string()));
        }

        Ok(Self {
            api: raw.api,
            kind,
            info,
            order: order_from_toml(&raw.order, Kind::Buildpack),
            root_dir: path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        })
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn is_composite(&self) -> bool {
        !self.order.is_empty()
    }

    pub fn detect_path(&self) -> PathBuf {
        self.root_dir.join("bin").join("detect")
    }

    /// Plan shipped with an extension that has no detect executable.
    pub fn prepopulated_plan_path(&self) -> PathBuf {
        self.root_dir.join("detect").join("plan.toml")
    }

    /// Reference carrying the declared API and homepage, as written to `group.toml`.
    pub fn reference(&self) -> Reference {
        Reference {
            id: self.info.id.clone(),
            version: self.info.version.clone(),
            api: Some(self.api.clone()),
            homepage: self.info.homepage.clone(),
            optional: false,
            kind: self.kind,
        }
    }
}
