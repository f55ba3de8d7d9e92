//! Ordered clause lists
//!
//! Each statement shape declares its optional clauses once, as a static list
//! of renderers. A clause appears in the output only when its renderer
//! yields text, and always in list position, whatever order the spec fields
//! were filled in.

use crate::error::{Error, Result};

/// One optional clause of a statement
pub struct Clause<S: 'static> {
    /// Leading keyword, used to check which clauses a statement carries
    pub keyword: &'static str,
    /// Full clause text, or `None` when the spec leaves it unset
    pub render: fn(&S) -> Option<String>,
}

/// Render every populated clause, in list order
pub fn render_clauses<S>(spec: &S, clauses: &[Clause<S>]) -> Vec<String> {
    clauses.iter().filter_map(|c| (c.render)(spec)).collect()
}

/// Keywords of the clauses a spec populates
pub fn populated_keywords<S>(spec: &S, clauses: &[Clause<S>]) -> Vec<&'static str> {
    clauses
        .iter()
        .filter(|c| (c.render)(spec).is_some())
        .map(|c| c.keyword)
        .collect()
}

/// A variant selector of a composite object type
pub trait Kind: Copy + PartialEq + 'static {
    fn name(self) -> &'static str;
}

/// A spec field and the kinds it belongs to
pub struct KindField<S: 'static, K: 'static> {
    pub field: &'static str,
    pub kinds: &'static [K],
    pub is_set: fn(&S) -> bool,
}

/// Reject a spec that fills in a field owned by another kind
pub fn check_kind_fields<S, K: Kind>(
    spec: &S,
    kind: K,
    object: &'static str,
    fields: &[KindField<S, K>],
) -> Result<()> {
    for f in fields {
        if (f.is_set)(spec) && !f.kinds.contains(&kind) {
            return Err(Error::KindMismatch {
                object,
                kind: kind.name(),
                field: f.field,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sample {
        a: Option<u32>,
        b: Option<&'static str>,
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Flavor {
        Sweet,
        Sour,
    }

    impl Kind for Flavor {
        fn name(self) -> &'static str {
            match self {
                Self::Sweet => "sweet",
                Self::Sour => "sour",
            }
        }
    }

    const CLAUSES: &[Clause<Sample>] = &[
        Clause {
            keyword: "A",
            render: |p| p.a.map(|a| format!("A {a}")),
        },
        Clause {
            keyword: "B",
            render: |p| p.b.map(|b| format!("B '{b}'")),
        },
    ];

    const FIELDS: &[KindField<Sample, Flavor>] = &[
        KindField {
            field: "a",
            kinds: &[Flavor::Sweet],
            is_set: |p| p.a.is_some(),
        },
        KindField {
            field: "b",
            kinds: &[Flavor::Sweet, Flavor::Sour],
            is_set: |p| p.b.is_some(),
        },
    ];

    #[test]
    fn test_render_skips_unset_clauses() {
        let sample = Sample {
            b: Some("x"),
            ..Default::default()
        };
        assert_eq!(render_clauses(&sample, CLAUSES), vec!["B 'x'"]);
        assert_eq!(populated_keywords(&sample, CLAUSES), vec!["B"]);
    }

    #[test]
    fn test_render_follows_list_order() {
        let sample = Sample {
            b: Some("x"),
            a: Some(1),
        };
        assert_eq!(render_clauses(&sample, CLAUSES), vec!["A 1", "B 'x'"]);
    }

    #[test]
    fn test_kind_fields() {
        let sample = Sample {
            a: Some(1),
            ..Default::default()
        };
        assert!(check_kind_fields(&sample, Flavor::Sweet, "sample", FIELDS).is_ok());
        assert_eq!(
            check_kind_fields(&sample, Flavor::Sour, "sample", FIELDS),
            Err(Error::KindMismatch {
                object: "sample",
                kind: "sour",
                field: "a",
            })
        );
    }
}
