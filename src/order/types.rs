use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a group element is a regular buildpack or an image extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    #[default]
    Buildpack,
    Extension,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Buildpack => "buildpack",
            Kind::Extension => "extension",
        }
    }

    /// File name of the descriptor inside a module's root directory.
    pub fn descriptor_file(&self) -> &'static str {
        match self {
            Kind::Buildpack => "buildpack.toml",
            Kind::Extension => "extension.toml",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to one buildpack or extension inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub kind: Kind,
}

impl Reference {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            api: None,
            homepage: None,
            optional: false,
            kind: Kind::Buildpack,
        }
    }

    pub fn extension(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: Kind::Extension,
            ..Self::new(id, version)
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_api(mut self, api: impl Into<String>) -> Self {
        self.api = Some(api.into());
        self
    }

    /// Copy with the `optional` flag cleared, as written to resolved groups.
    pub fn no_opt(&self) -> Self {
        Self {
            optional: false,
            ..self.clone()
        }
    }

    pub fn is_extension(&self) -> bool {
        self.kind == Kind::Extension
    }

    /// Identity of the module, independent of group-level flags.
    pub fn key(&self) -> ModuleKey {
        ModuleKey {
            kind: self.kind,
            id: self.id.clone(),
            version: self.version.clone(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleKey {
    pub kind: Kind,
    pub id: String,
    pub version: String,
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}@{}", self.kind, self.id, self.version)
    }
}

/// One element of a group: a module reference or a nested order spliced in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupElement {
    Reference(Reference),
    NestedOrder(Order),
}

impl From<Reference> for GroupElement {
    fn from(reference: Reference) -> Self {
        GroupElement::Reference(reference)
    }
}

impl From<Order> for GroupElement {
    fn from(order: Order) -> Self {
        GroupElement::NestedOrder(order)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group {
    pub elements: Vec<GroupElement>,
}

impl Group {
    pub fn new(elements: Vec<GroupElement>) -> Self {
        Self { elements }
    }

    pub fn of(references: impl IntoIterator<Item = Reference>) -> Self {
        Self {
            elements: references.into_iter().map(GroupElement::from).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Prioritised list of candidate groups: try the first, then the next, and so on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Order {
    pub groups: Vec<Group>,
}

impl Order {
    pub fn new(groups: Vec<Group>) -> Self {
        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}

impl FromIterator<Group> for Order {
    fn from_iter<T: IntoIterator<Item = Group>>(iter: T) -> Self {
        Self {
            groups: iter.into_iter().collect(),
        }
    }
}

/// Returns a new order where every group is preceded by the extensions order.
///
/// Extension elements are marked as optional extensions. The spliced nested
/// order ends with an empty group, so a candidate without any extension is
/// still tried after every extension group.
pub fn prepend_extensions(order: &Order, extensions: &Order) -> Order {
    if extensions.is_empty() {
        return order.clone();
    }

    let mut ext_groups: Vec<Group> = extensions
        .groups
        .iter()
        .map(|group| Group::new(group.elements.iter().map(mark_extension).collect()))
        .collect();
    ext_groups.push(Group::default());
    let ext_order = Order::new(ext_groups);

    order
        .groups
        .iter()
        .map(|group| {
            let mut elements = Vec::with_capacity(group.elements.len() + 1);
            elements.push(GroupElement::NestedOrder(ext_order.clone()));
            elements.extend(group.elements.iter().cloned());
            Group::new(elements)
        })
        .collect()
}

fn mark_extension(element: &GroupElement) -> GroupElement {
    match element {
        GroupElement::Reference(r) => GroupElement::Reference(Reference {
            kind: Kind::Extension,
            optional: true,
            ..r.clone()
        }),
        GroupElement::NestedOrder(o) => GroupElement::NestedOrder(Order::new(
            o.groups
                .iter()
                .map(|g| Group::new(g.elements.iter().map(mark_extension).collect()))
                .collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_display() {
        assert_eq!(Reference::new("acme/node", "1.2.0").to_string(), "acme/node@1.2.0");
    }

    #[test]
    fn test_no_opt_keeps_identity() {
        let r = Reference::new("A", "v1").optional().with_api("0.9");
        let stripped = r.no_opt();
        assert!(!stripped.optional);
        assert_eq!(stripped.api.as_deref(), Some("0.9"));
        assert_eq!(stripped.key(), r.key());
    }

    #[test]
    fn test_prepend_extensions() {
        let order = Order::new(vec![
            Group::of([Reference::new("A", "v1")]),
            Group::of([Reference::new("B", "v1")]),
        ]);
        let ext = Order::new(vec![
            Group::of([Reference::new("C", "v1")]),
            Group::of([Reference::new("D", "v1")]),
        ]);

        let result = prepend_extensions(&order, &ext);

        let expected_ext = Order::new(vec![
            Group::of([Reference::extension("C", "v1").optional()]),
            Group::of([Reference::extension("D", "v1").optional()]),
            Group::default(),
        ]);
        assert_eq!(
            result,
            Order::new(vec![
                Group::new(vec![
                    GroupElement::NestedOrder(expected_ext.clone()),
                    Reference::new("A", "v1").into(),
                ]),
                Group::new(vec![
                    GroupElement::NestedOrder(expected_ext),
                    Reference::new("B", "v1").into(),
                ]),
            ])
        );

        // input untouched
        assert_eq!(order.groups[0], Group::of([Reference::new("A", "v1")]));
    }

    #[test]
    fn test_prepend_empty_extensions_is_identity() {
        let order = Order::new(vec![Group::of([Reference::new("A", "v1")])]);
        assert_eq!(prepend_extensions(&order, &Order::default()), order);
    }
}
