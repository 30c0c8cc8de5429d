//! Slot contract resolution
//!
//! All contexts declared for one slot are merged into a single synthesized
//! [`ContextSpec`]. Providing attributes (defined or optional) are unioned;
//! every required attribute must then be satisfied by the union.

use crate::error::SetupError;
use crate::processing::UnusedAttribute;
use ally_context::{defines_if, ContextSpec, Declaration, Status, TypeSet};
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;

/// Context declared for a slot by one handler
#[derive(Debug, Clone)]
pub(crate) struct Contribution {
    pub(crate) source: String,
    pub(crate) spec: Arc<ContextSpec>,
}

/// Outcome of merging one slot
#[derive(Debug)]
pub(crate) struct Merged {
    pub(crate) spec: Arc<ContextSpec>,
    pub(crate) unused: Vec<UnusedAttribute>,
}

#[derive(Debug)]
struct Provided<'c> {
    status: Status,
    types: TypeSet,
    doc: Option<&'c str>,
    conditional: bool,
    defined_by: Vec<&'c str>,
    // Every provider's set; pairwise nested, so they form an inclusion chain
    offered: Vec<(&'c TypeSet, &'c str)>,
}

/// Merge the contributions of `slot`
pub(crate) fn merge_slot(slot: &str, contributions: &[Contribution]) -> Result<Merged, SetupError> {
    let mut provided: IndexMap<&str, Provided<'_>> = IndexMap::new();
    let mut referenced: IndexSet<&str> = IndexSet::new();

    for contribution in contributions {
        let source = contribution.source.as_str();
        for attr in contribution.spec.attributes() {
            match attr.status() {
                Status::Required => {
                    referenced.insert(attr.name());
                    continue;
                }
                Status::Optional => {
                    referenced.insert(attr.name());
                }
                Status::Defined => {}
            }

            let Some(current) = provided.get_mut(attr.name()) else {
                provided.insert(
                    attr.name(),
                    Provided {
                        status: attr.status(),
                        types: attr.types().clone(),
                        doc: attr.doc(),
                        conditional: attr.is_conditional(),
                        defined_by: defined_by(attr.status(), source),
                        offered: vec![(attr.types(), source)],
                    },
                );
                continue;
            };

            let conflict = current
                .offered
                .iter()
                .find(|(types, _)| !types.is_subset(attr.types()) && !attr.types().is_subset(types));
            if let Some((types, by)) = conflict {
                return Err(SetupError::AmbiguousAttribute {
                    slot: slot.to_string(),
                    attribute: attr.name().to_string(),
                    first: types.to_string(),
                    first_by: (*by).to_string(),
                    second: attr.types().to_string(),
                    second_by: source.to_string(),
                });
            }
            current.offered.push((attr.types(), source));
            if current.types.is_subset(attr.types()) {
                current.types = attr.types().clone();
            }
            if attr.status() == Status::Defined {
                current.status = Status::Defined;
                current.defined_by.push(source);
            }
            current.conditional &= attr.is_conditional();
            if current.doc.is_none() {
                current.doc = attr.doc();
            }
        }
    }

    for contribution in contributions {
        for attr in contribution.spec.required() {
            let Some(provider) = provided.get(attr.name()) else {
                return Err(SetupError::UnresolvedAttribute {
                    slot: slot.to_string(),
                    attribute: attr.name().to_string(),
                    required_by: contribution.source.clone(),
                });
            };
            if !attr.types().is_subset(&provider.types) {
                return Err(SetupError::IncompatibleAttribute {
                    slot: slot.to_string(),
                    attribute: attr.name().to_string(),
                    required_by: contribution.source.clone(),
                    required: attr.types().to_string(),
                    provided: provider.types.to_string(),
                });
            }
        }
    }

    let mut builder = ContextSpec::define(format!("{slot}$Merged"));
    let mut unused = Vec::new();
    for (name, attr) in provided {
        if attr.conditional {
            // Conditional definitions only exist when someone asks for them
            if !referenced.contains(name) {
                continue;
            }
        } else if attr.status == Status::Defined && !referenced.contains(name) {
            unused.push(UnusedAttribute {
                slot: slot.to_string(),
                attribute: name.to_string(),
                defined_by: attr.defined_by.iter().map(ToString::to_string).collect(),
            });
        }
        let mut declaration = if attr.conditional {
            defines_if(attr.types)
        } else {
            Declaration::new(attr.status, attr.types)
        };
        if let Some(doc) = attr.doc {
            declaration = declaration.doc(doc);
        }
        builder = builder.attribute(name, declaration);
    }

    Ok(Merged {
        spec: Arc::new(builder.build()?),
        unused,
    })
}

fn defined_by(status: Status, source: &str) -> Vec<&str> {
    if status == Status::Defined {
        vec![source]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ally_context::{defines, optional, requires, types, Attribute};
    use pretty_assertions::assert_eq;

    fn contribution(source: &str, spec: ContextSpec) -> Contribution {
        Contribution {
            source: source.to_string(),
            spec: Arc::new(spec),
        }
    }

    fn spec(name: &str, attrs: Vec<(&str, Declaration)>) -> ContextSpec {
        attrs
            .into_iter()
            .fold(ContextSpec::define(name), |b, (n, d)| b.attribute(n, d))
            .build()
            .unwrap()
    }

    #[test]
    fn merges_providers_in_order() {
        let merged = merge_slot(
            "request",
            &[
                contribution("server", spec("A", vec![("method", defines(types![String]))])),
                contribution("decoder", spec("B", vec![("body", optional(types![Vec<u8>]))])),
                contribution("router", spec("C", vec![("method", requires(types![String]))])),
            ],
        )
        .unwrap();

        assert_eq!(merged.spec.name(), "request$Merged");
        let names: Vec<_> = merged.spec.attributes().map(Attribute::name).collect();
        assert_eq!(names, vec!["method", "body"]);
        assert!(merged.unused.is_empty());
    }

    #[test]
    fn nested_types_take_the_wider_set() {
        let merged = merge_slot(
            "request",
            &[
                contribution("a", spec("A", vec![("uri", optional(types![String]))])),
                contribution("b", spec("B", vec![("uri", defines(types![String, Vec<u8>]))])),
                contribution("c", spec("C", vec![("uri", requires(types![Vec<u8>]))])),
            ],
        )
        .unwrap();
        let uri = merged.spec.attribute("uri").unwrap();
        assert_eq!(uri.types(), &types![String, Vec<u8>]);
        assert_eq!(uri.status(), Status::Defined);
    }

    #[test]
    fn unrelated_types_are_ambiguous() {
        let err = merge_slot(
            "request",
            &[
                contribution("a", spec("A", vec![("id", defines(types![i64]))])),
                contribution("b", spec("B", vec![("id", defines(types![String]))])),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, SetupError::AmbiguousAttribute { ref first_by, ref second_by, .. }
            if first_by == "a" && second_by == "b"));
    }

    #[test]
    fn ambiguity_does_not_depend_on_provider_order() {
        let a = || contribution("a", spec("A", vec![("value", defines(types![i64]))]));
        let b = || contribution("b", spec("B", vec![("value", defines(types![i64, String]))]));
        let c = || contribution("c", spec("C", vec![("value", defines(types![String]))]));

        let orders = [
            vec![a(), b(), c()],
            vec![a(), c(), b()],
            vec![b(), a(), c()],
            vec![b(), c(), a()],
            vec![c(), a(), b()],
            vec![c(), b(), a()],
        ];
        for order in &orders {
            let err = merge_slot("x", order).unwrap_err();
            assert!(
                matches!(err, SetupError::AmbiguousAttribute { ref first_by, ref second_by, .. }
                    if [first_by.as_str(), second_by.as_str()].contains(&"a")
                        && [first_by.as_str(), second_by.as_str()].contains(&"c")),
                "unexpected {err}"
            );
        }
    }

    #[test]
    fn nested_chain_merges_in_any_order() {
        let a = || contribution("a", spec("A", vec![("value", defines(types![i64]))]));
        let b = || contribution("b", spec("B", vec![("value", optional(types![i64, String]))]));
        let c = || contribution("c", spec("C", vec![("value", optional(types![i64, String, u8]))]));

        for order in [vec![a(), b(), c()], vec![c(), a(), b()], vec![b(), c(), a()]] {
            let merged = merge_slot("x", &order).unwrap();
            let value = merged.spec.attribute("value").unwrap();
            assert_eq!(value.types(), &types![i64, String, u8]);
            assert_eq!(value.status(), Status::Defined);
        }
    }

    #[test]
    fn unresolved_requirement() {
        let err = merge_slot(
            "request",
            &[contribution("router", spec("C", vec![("uri", requires(types![String]))]))],
        )
        .unwrap_err();
        assert!(matches!(err, SetupError::UnresolvedAttribute { ref required_by, .. } if required_by == "router"));
    }

    #[test]
    fn incompatible_requirement() {
        let err = merge_slot(
            "request",
            &[
                contribution("server", spec("A", vec![("uri", defines(types![String]))])),
                contribution("router", spec("C", vec![("uri", requires(types![String, Vec<u8>]))])),
            ],
        )
        .unwrap_err();
        assert!(err.is_resolution_error());
        assert!(matches!(err, SetupError::IncompatibleAttribute { .. }));
    }

    #[test]
    fn unused_defined_attribute_is_reported() {
        let merged = merge_slot(
            "response",
            &[
                contribution("a", spec("A", vec![("code", defines(types![u16]))])),
                contribution("b", spec("B", vec![("text", defines(types![String]))])),
                contribution("c", spec("C", vec![("text", optional(types![String]))])),
            ],
        )
        .unwrap();
        assert_eq!(
            merged.unused,
            vec![UnusedAttribute {
                slot: "response".into(),
                attribute: "code".into(),
                defined_by: vec!["a".into()],
            }]
        );
    }

    #[test]
    fn conditional_definition_needs_a_reference() {
        let alone = merge_slot(
            "response",
            &[contribution("a", spec("A", vec![("length", defines_if(types![u64]))]))],
        )
        .unwrap();
        assert!(!alone.spec.declares("length"));
        assert!(alone.unused.is_empty());

        let wanted = merge_slot(
            "response",
            &[
                contribution("a", spec("A", vec![("length", defines_if(types![u64]))])),
                contribution("b", spec("B", vec![("length", requires(types![u64]))])),
            ],
        )
        .unwrap();
        let length = wanted.spec.attribute("length").unwrap();
        assert!(length.is_conditional());
    }

    #[test]
    fn doc_is_kept_from_first_provider() {
        let merged = merge_slot(
            "request",
            &[
                contribution("a", spec("A", vec![("method", optional(types![String]))])),
                contribution(
                    "b",
                    spec("B", vec![("method", defines(types![String]).doc("verb"))]),
                ),
            ],
        )
        .unwrap();
        assert_eq!(merged.spec.attribute("method").and_then(Attribute::doc), Some("verb"));
    }
}
