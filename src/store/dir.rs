use super::{Descriptor, DescriptorStore, StoreError};
use crate::order::Kind;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads descriptors from the on-disk layout
/// `<dir>/<escaped id>/<version>/<buildpack|extension>.toml`.
#[derive(Debug, Clone)]
pub struct DirStore {
    buildpacks_dir: PathBuf,
    extensions_dir: Option<PathBuf>,
}

impl DirStore {
    pub fn new(buildpacks_dir: impl Into<PathBuf>) -> Self {
        Self {
            buildpacks_dir: buildpacks_dir.into(),
            extensions_dir: None,
        }
    }

    pub fn with_extensions(mut self, extensions_dir: impl Into<PathBuf>) -> Self {
        self.extensions_dir = Some(extensions_dir.into());
        self
    }

    fn base_dir(&self, kind: Kind) -> Option<&Path> {
        match kind {
            Kind::Buildpack => Some(self.buildpacks_dir.as_path()),
            Kind::Extension => self.extensions_dir.as_deref(),
        }
    }

    /// Version directory to read. An empty version selects the only one present.
    fn version_dir(&self, module_dir: &Path, version: &str) -> Option<PathBuf> {
        if !version.is_empty() {
            return Some(module_dir.join(version));
        }

        let entries: Vec<PathBuf> = fs::read_dir(module_dir)
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();

        match entries.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        }
    }
}

pub fn escape_id(id: &str) -> String {
    id.replace('/', "_")
}

impl DescriptorStore for DirStore {
    fn lookup(&self, id: &str, version: &str, kind: Kind) -> Result<Descriptor, StoreError> {
        let not_found = || StoreError::NotFound {
            kind,
            id: id.to_string(),
            version: version.to_string(),
        };

        let base = self.base_dir(kind).ok_or_else(not_found)?;
        let module_dir = base.join(escape_id(id));
        let dir = self.version_dir(&module_dir, version).ok_or_else(not_found)?;
        let path = dir.join(kind.descriptor_file());

        debug!(path = %path.display(), "Reading descriptor");
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let descriptor = Descriptor::parse(&contents, kind, &path)?;
        if descriptor.info.id != id {
            return Err(StoreError::Mismatch {
                path,
                expected: id.to_string(),
                found: descriptor.info.id,
            });
        }
        Ok(descriptor)
    }
}
