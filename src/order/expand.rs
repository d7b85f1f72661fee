use super::{Group, GroupElement, ModuleKey, Order, OrderError, Reference};

/// Expands an order tree into the flat list of concrete candidate groups.
///
/// Every nested order is replaced, in place, by each of its groups in turn,
/// so a group holding a nested order with N groups yields N candidates.
/// Candidates come out in priority order: outer choices vary slowest and
/// declaration order is kept at every level.
///
/// `composite` is asked about every reference; returning `Some(order)` marks
/// it as a composite buildpack whose own order is spliced in its place. The
/// expanded elements inherit `optional` from the referencing element, and a
/// module already present earlier in the candidate is not added twice.
pub fn flatten<E, F>(order: &Order, mut composite: F) -> Result<Vec<Vec<Reference>>, E>
where
    F: FnMut(&Reference) -> Result<Option<Order>, E>,
    E: From<OrderError>,
{
    let mut stack = Vec::new();
    expand_order(order, false, &mut composite, &mut stack)
}

fn expand_order<E, F>(
    order: &Order,
    inherit_optional: bool,
    composite: &mut F,
    stack: &mut Vec<ModuleKey>,
) -> Result<Vec<Vec<Reference>>, E>
where
    F: FnMut(&Reference) -> Result<Option<Order>, E>,
    E: From<OrderError>,
{
    let mut candidates = Vec::new();
    for group in &order.groups {
        candidates.extend(expand_group(group, inherit_optional, composite, stack)?);
    }
    Ok(candidates)
}

fn expand_group<E, F>(
    group: &Group,
    inherit_optional: bool,
    composite: &mut F,
    stack: &mut Vec<ModuleKey>,
) -> Result<Vec<Vec<Reference>>, E>
where
    F: FnMut(&Reference) -> Result<Option<Order>, E>,
    E: From<OrderError>,
{
    let mut candidates: Vec<Vec<Reference>> = vec![Vec::new()];

    for element in &group.elements {
        let alternatives = match element {
            GroupElement::Reference(reference) => {
                let mut reference = reference.clone();
                reference.optional |= inherit_optional;

                match composite(&reference)? {
                    Some(sub_order) => {
                        let key = reference.key();
                        if stack.contains(&key) {
                            return Err(OrderError::CompositeCycle(reference.to_string()).into());
                        }
                        stack.push(key);
                        let expanded =
                            expand_order(&sub_order, reference.optional, composite, stack);
                        stack.pop();
                        expanded?
                    }
                    None => vec![vec![reference]],
                }
            }
            GroupElement::NestedOrder(sub_order) => {
                expand_order(sub_order, inherit_optional, composite, stack)?
            }
        };

        let mut next = Vec::with_capacity(candidates.len() * alternatives.len().max(1));
        for prefix in &candidates {
            for alternative in &alternatives {
                let mut candidate = prefix.clone();
                for reference in alternative {
                    if !candidate.iter().any(|r| r.key() == reference.key()) {
                        candidate.push(reference.clone());
                    }
                }
                next.push(candidate);
            }
        }
        candidates = next;
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::prepend_extensions;

    fn plain(_: &Reference) -> Result<Option<Order>, OrderError> {
        Ok(None)
    }

    fn ids(candidates: &[Vec<Reference>]) -> Vec<Vec<String>> {
        candidates
            .iter()
            .map(|c| c.iter().map(|r| r.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_flat_order_is_unchanged() {
        let order = Order::new(vec![
            Group::of([Reference::new("A", "v1"), Reference::new("B", "v1")]),
            Group::of([Reference::new("C", "v1")]),
        ]);
        let candidates = flatten(&order, plain).unwrap();
        assert_eq!(
            ids(&candidates),
            vec![vec!["A@v1", "B@v1"], vec!["C@v1"]]
        );
    }

    #[test]
    fn test_nested_order_splices_each_sub_group() {
        let nested = Order::new(vec![
            Group::of([Reference::new("X", "v1")]),
            Group::of([Reference::new("Y", "v1"), Reference::new("Z", "v1")]),
        ]);
        let order = Order::new(vec![Group::new(vec![
            Reference::new("A", "v1").into(),
            nested.into(),
            Reference::new("B", "v1").into(),
        ])]);

        let candidates = flatten(&order, plain).unwrap();
        assert_eq!(
            ids(&candidates),
            vec![
                vec!["A@v1", "X@v1", "B@v1"],
                vec!["A@v1", "Y@v1", "Z@v1", "B@v1"],
            ]
        );
    }

    #[test]
    fn test_outer_choice_varies_slowest() {
        let first = Order::new(vec![
            Group::of([Reference::new("A", "v1")]),
            Group::of([Reference::new("B", "v1")]),
        ]);
        let second = Order::new(vec![
            Group::of([Reference::new("C", "v1")]),
            Group::of([Reference::new("D", "v1")]),
        ]);
        let order = Order::new(vec![Group::new(vec![first.into(), second.into()])]);

        let candidates = flatten(&order, plain).unwrap();
        assert_eq!(
            ids(&candidates),
            vec![
                vec!["A@v1", "C@v1"],
                vec!["A@v1", "D@v1"],
                vec!["B@v1", "C@v1"],
                vec!["B@v1", "D@v1"],
            ]
        );
    }

    #[test]
    fn test_deeply_nested_orders() {
        let inner = Order::new(vec![
            Group::of([Reference::new("I1", "v1")]),
            Group::of([Reference::new("I2", "v1")]),
        ]);
        let middle = Order::new(vec![
            Group::new(vec![Reference::new("M", "v1").into(), inner.into()]),
            Group::of([Reference::new("N", "v1")]),
        ]);
        let order = Order::new(vec![Group::new(vec![middle.into()])]);

        let candidates = flatten(&order, plain).unwrap();
        assert_eq!(
            ids(&candidates),
            vec![vec!["M@v1", "I1@v1"], vec!["M@v1", "I2@v1"], vec!["N@v1"]]
        );
    }

    #[test]
    fn test_extensions_order_candidates() {
        let order = Order::new(vec![
            Group::of([Reference::new("A", "v1")]),
            Group::of([Reference::new("B", "v1")]),
        ]);
        let ext = Order::new(vec![
            Group::of([Reference::new("A", "v1")]),
            Group::of([Reference::new("B", "v1")]),
        ]);

        let candidates = flatten(&prepend_extensions(&order, &ext), plain).unwrap();
        assert_eq!(candidates.len(), 6);
        assert!(candidates[0][0].is_extension());
        assert!(candidates[0][0].optional);
        // the extension-free candidate comes after every extension candidate
        assert_eq!(candidates[2], vec![Reference::new("A", "v1")]);
        assert_eq!(candidates[5], vec![Reference::new("B", "v1")]);
    }

    #[test]
    fn test_composite_expands_and_inherits_optional() {
        let meta = Reference::new("meta", "v1");
        let order = Order::new(vec![Group::of([
            Reference::new("A", "v1"),
            meta.clone().optional(),
        ])]);

        let candidates = flatten(&order, |r: &Reference| -> Result<_, OrderError> {
            if r.id == "meta" {
                Ok(Some(Order::new(vec![
                    Group::of([Reference::new("B", "v1"), Reference::new("A", "v1")]),
                    Group::of([Reference::new("C", "v1")]),
                ])))
            } else {
                Ok(None)
            }
        })
        .unwrap();

        assert_eq!(ids(&candidates), vec![vec!["A@v1", "B@v1"], vec!["A@v1", "C@v1"]]);
        assert!(candidates[0][1].optional);
        assert!(candidates[1][1].optional);
        assert!(!candidates[0][0].optional);
    }

    #[test]
    fn test_composite_cycle_is_rejected() {
        let order = Order::new(vec![Group::of([Reference::new("loop", "v1")])]);
        let err = flatten(&order, |r: &Reference| -> Result<_, OrderError> {
            Ok(Some(Order::new(vec![Group::of([r.clone()])])))
        })
        .unwrap_err();
        assert!(matches!(err, OrderError::CompositeCycle(_)));
    }

    #[test]
    fn test_empty_nested_group_yields_prefix_only() {
        let nested = Order::new(vec![Group::default()]);
        let order = Order::new(vec![Group::new(vec![
            nested.into(),
            Reference::new("A", "v1").into(),
        ])]);
        assert_eq!(ids(&flatten(&order, plain).unwrap()), vec![vec!["A@v1"]]);
    }
}
