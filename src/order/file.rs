use super::{Group, GroupElement, Kind, Order, OrderError, Reference};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// An `[[order.group]]` entry as written in `order.toml` and `buildpack.toml`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ElementToml {
    pub id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GroupToml {
    #[serde(default)]
    pub group: Vec<ElementToml>,
}

#[derive(Debug, Default, Deserialize)]
struct OrderToml {
    #[serde(default)]
    order: Vec<GroupToml>,
    #[serde(default, rename = "order-extensions")]
    order_extensions: Vec<GroupToml>,
}

pub(crate) fn order_from_toml(groups: &[GroupToml], kind: Kind) -> Order {
    groups
        .iter()
        .map(|g| {
            Group::new(
                g.group
                    .iter()
                    .map(|e| {
                        GroupElement::Reference(Reference {
                            optional: e.optional,
                            kind,
                            ..Reference::new(e.id.clone(), e.version.clone())
                        })
                    })
                    .collect(),
            )
        })
        .collect()
}

/// The buildpacks order and the extensions order read from an `order.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDocument {
    pub order: Order,
    pub extensions: Order,
}

impl OrderDocument {
    pub fn parse(contents: &str) -> Result<Self, OrderError> {
        let raw: OrderToml =
            toml::from_str(contents).map_err(|e| OrderError::Parse(e.to_string()))?;

        for group in raw.order.iter().chain(raw.order_extensions.iter()) {
            for element in &group.group {
                if element.id.trim().is_empty() {
                    return Err(OrderError::Parse(
                        "group element is missing an 'id'".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            order: order_from_toml(&raw.order, Kind::Buildpack),
            extensions: order_from_toml(&raw.order_extensions, Kind::Extension),
        })
    }

    pub fn read(path: &Path) -> Result<Self, OrderError> {
        let contents = fs::read_to_string(path).map_err(|source| OrderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|e| match e {
            OrderError::Parse(message) => OrderError::Malformed {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// The order to detect against: extensions prepended when present.
    pub fn detect_order(&self) -> Order {
        super::prepend_extensions(&self.order, &self.extensions)
    }
}
