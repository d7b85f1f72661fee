use super::{Descriptor, DescriptorInfo, DescriptorStore, StoreError};
use crate::order::{Kind, ModuleKey, Order};
use std::collections::HashMap;
use std::path::PathBuf;

/// In-memory descriptor store for tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    descriptors: HashMap<ModuleKey, Descriptor>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: Descriptor) {
        let key = ModuleKey {
            kind: descriptor.kind,
            id: descriptor.info.id.clone(),
            version: descriptor.info.version.clone(),
        };
        self.descriptors.insert(key, descriptor);
    }

    /// Adds a buildpack with the given API and a synthetic root directory.
    pub fn with_buildpack(mut self, id: &str, version: &str, api: &str) -> Self {
        self.insert(synthetic(Kind::Buildpack, id, version, api));
        self
    }

    pub fn with_extension(mut self, id: &str, version: &str, api: &str) -> Self {
        self.insert(synthetic(Kind::Extension, id, version, api));
        self
    }

    pub fn with_composite(mut self, id: &str, version: &str, api: &str, order: Order) -> Self {
        self.insert(synthetic(Kind::Buildpack, id, version, api).with_order(order));
        self
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn synthetic(kind: Kind, id: &str, version: &str, api: &str) -> Descriptor {
    Descriptor::new(
        kind,
        api,
        DescriptorInfo {
            id: id.to_string(),
            version: version.to_string(),
            ..Default::default()
        },
        PathBuf::from("/cnb").join(super::escape_id(id)).join(version),
    )
}

impl DescriptorStore for MemoryStore {
    fn lookup(&self, id: &str, version: &str, kind: Kind) -> Result<Descriptor, StoreError> {
        let key = ModuleKey {
            kind,
            id: id.to_string(),
            version: version.to_string(),
        };
        self.descriptors
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind,
                id: id.to_string(),
                version: version.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_kind() {
        let store = MemoryStore::new()
            .with_buildpack("A", "v1", "0.9")
            .with_extension("A", "v1", "0.10");
        assert_eq!(store.len(), 2);

        assert_eq!(store.lookup("A", "v1", Kind::Buildpack).unwrap().api, "0.9");
        assert_eq!(store.lookup("A", "v1", Kind::Extension).unwrap().api, "0.10");
        assert!(store.lookup("A", "v2", Kind::Buildpack).is_err());
    }
}
