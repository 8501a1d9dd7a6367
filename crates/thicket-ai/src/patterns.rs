//! Cluster expansion patterns
//!
//! Each seed is widened by evaluating an ordered list of declarative traversal
//! descriptors and unioning what they return. The default stack is
//! deliberately redundant:
//!
//! | pattern | hops | relationships | labels | cap | walked edges kept |
//! |---------|------|---------------|--------|-----|-----------------------|
//! | call chain | 1..=3 | `CALLS_METHOD` | any | none | yes |
//! | neighbourhood | 1..=2 | any | any | 30 | no |
//! | nearby methods | 1..=3 | any | `Method` | 10 | no |
//! | seed | 0 | none | any | none | no |
//!
//! Which relationships a cluster keeps is decided by
//! [`RelationshipPolicy`](thicket_core::RelationshipPolicy): none by default,
//! the call-chain discovery edges under `Traversed`, or every relationship
//! among the cluster's nodes under `Induced`.

use thicket_core::{EdgeKind, NodeLabel, TraversalSpec};

/// Cap on the any-relationship neighbourhood; applies to encounter order.
pub const NEIGHBOURHOOD_CAP: usize = 30;

/// How many of the nearest methods (by hop distance) a cluster takes in.
pub const NEARBY_METHODS_CAP: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalPattern {
    pub name: &'static str,
    pub spec: TraversalSpec,
}

impl TraversalPattern {
    pub fn new(name: &'static str, spec: TraversalSpec) -> Self {
        Self { name, spec }
    }
}

pub fn call_chain() -> TraversalPattern {
    TraversalPattern::new(
        "call chain",
        TraversalSpec {
            edge_filter: Some(vec![EdgeKind::CallsMethod]),
            collect_relationships: true,
            ..TraversalSpec::within(3)
        },
    )
}

pub fn neighbourhood() -> TraversalPattern {
    TraversalPattern::new(
        "neighbourhood",
        TraversalSpec {
            cap: Some(NEIGHBOURHOOD_CAP),
            ..TraversalSpec::within(2)
        },
    )
}

pub fn nearby_methods() -> TraversalPattern {
    TraversalPattern::new(
        "nearby methods",
        TraversalSpec {
            label_filter: Some(NodeLabel::Method),
            cap: Some(NEARBY_METHODS_CAP),
            ..TraversalSpec::within(3)
        },
    )
}

/// The seed on its own, so every cluster contains it.
pub fn seed() -> TraversalPattern {
    TraversalPattern::new(
        "seed",
        TraversalSpec {
            min_hops: 0,
            ..TraversalSpec::within(0)
        },
    )
}

pub fn default_patterns() -> Vec<TraversalPattern> {
    vec![call_chain(), neighbourhood(), nearby_methods(), seed()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stack_order_and_shape() {
        let patterns = default_patterns();
        let names: Vec<_> = patterns.iter().map(|p| p.name).collect();
        assert_eq!(names, ["call chain", "neighbourhood", "nearby methods", "seed"]);

        assert!(patterns[0].spec.allows_edge(EdgeKind::CallsMethod));
        assert!(!patterns[0].spec.allows_edge(EdgeKind::UsesClass));
        assert_eq!(patterns[1].spec.cap, Some(30));
        assert_eq!(patterns[2].spec.label_filter, Some(NodeLabel::Method));
        assert_eq!((patterns[3].spec.min_hops, patterns[3].spec.max_hops), (0, 0));
        assert_eq!(
            patterns.iter().filter(|p| p.spec.collect_relationships).count(),
            1
        );
    }
}
