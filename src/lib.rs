//! Sortal: a compositional sort algebra with a graded matching engine.
//!
//! Sorts are types built from a small algebra:
//! - primitive sorts anchored to a characteristic category, `[Label] name`;
//! - attribute composition, `base ^ weight`, right-associative;
//! - disjunction, `a + b`, flat, duplicate-free and order-independent;
//! - aspects sorts, `(src, dst): [Relation] (X, Y)`, declaring named views
//!   of a link between sorts;
//! - recursive sorts, created when a definition refers to itself.
//!
//! Every sort lives in a [`Registry`], which compiles definition text,
//! resolves names, rolls back failed definitions, and relates sorts to one
//! another. Relating two sorts yields a [`Match`](matching::Match) with a
//! [`Level`](matching::Level) of correspondence, a [`Grade`](matching::Grade)
//! of containment, the decomposition it was derived from and an exact
//! rational score breaking ties.
//!
//! # References
//!
//! - Goguen, J. & Meseguer, J. "Order-sorted algebra I" (1992) – sorts and subsorts
//! - Rada, R. et al. "Development and application of a metric on semantic nets" (1989) – graded similarity
//! - Norvig, P. "Techniques for automatic memoization" (1991)
//!
//! # Example
//!
//! ```
//! use sortal::prelude::*;
//!
//! let categories = CategoryTable::new()
//!     .with_category("Label", ParamShape::Identifier)
//!     .with_category("Relation", ParamShape::Sorts(2));
//! let mut registry = Registry::new(categories);
//! registry.define("a: [Label] a; b: [Label] b; c: [Label] c").unwrap();
//! let s = registry.define("s: a + b + c").unwrap();
//! let t = registry.define("t: c + b + a").unwrap();
//! assert_eq!(
//!     registry.get(s).unwrap().canonical(),
//!     registry.get(t).unwrap().canonical()
//! );
//! let m = registry.match_sorts(s, t).unwrap();
//! assert_eq!(registry.get_match(m).unwrap().level(), Level::Equivalent);
//! ```

pub mod arena;
pub mod category;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod matching;
pub mod operations;
mod parser;
pub mod registry;
pub mod sort;
pub mod tokenizer;

pub use arena::{RegistryId, SortId};
pub use error::{Diagnostic, DiagnosticKind, SortError};
pub use registry::Registry;

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::arena::{RegistryId, SortId};
    pub use crate::category::{CategoryShape, CategorySource, CategoryTable, Form, ParamShape};
    pub use crate::config::RegistryConfig;
    pub use crate::error::{Diagnostic, DiagnosticKind, SortError};
    pub use crate::matching::{Grade, Level, Match, MatchId, MatchMetrics, MatchReport, MatchStats, Ratio};
    pub use crate::operations::{combine, contains, declare_aspects, duplicate, part_of, primitive, sum};
    pub use crate::registry::Registry;
    pub use crate::sort::{Argument, Sort, SortStats, Variant};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use proptest::prelude::*;

    fn categories() -> CategoryTable {
        CategoryTable::new()
            .with_category("Label", ParamShape::Identifier)
            .with_category("Count", ParamShape::Bound)
            .with_category("Flag", ParamShape::Nothing)
            .with_category("Relation", ParamShape::Sorts(2))
    }

    fn level(reg: &mut Registry, a: SortId, b: SortId) -> Level {
        let m = reg.match_sorts(a, b).unwrap();
        reg.get_match(m).unwrap().level()
    }

    /// Every sort is identical to itself.
    #[test]
    fn reflexive_identity() {
        let mut reg = Registry::new(categories());
        let sorts = reg
            .define_all("a: [Label] a; b: a ^ [Flag]; c: a + b; r: a ^ r; (p, q): [Relation] (a, b)")
            .unwrap();
        for sort in sorts.into_iter().chain(reg.sort_of("p")) {
            let m = reg.match_sorts(sort, sort).unwrap();
            let node = reg.get_match(m).unwrap();
            assert_eq!(node.level(), Level::Identical);
            assert_eq!(node.grade(), Grade::Concordant);
        }
    }

    /// Two named sorts with the same definition are equivalent, not identical.
    #[test]
    fn same_definition_is_equivalent() {
        let mut reg = Registry::new(categories());
        let a = reg.define("a: [Label]").unwrap();
        let b = reg.define("b: [Label]").unwrap();
        let m = reg.match_sorts(a, b).unwrap();
        let node = reg.get_match(m).unwrap();
        assert_eq!(node.level(), Level::Equivalent);
        assert_eq!(node.stats().by_definition, 1);
    }

    /// Disjunctions written in different orders reduce to the same string.
    #[test]
    fn disjunction_order_is_irrelevant() {
        let mut reg = Registry::new(categories());
        reg.define("a: [Label] a; b: [Label] b; c: [Label] c").unwrap();
        let s = reg.define("s: a + b + c").unwrap();
        let t = reg.define("t: c + b + a").unwrap();
        assert_eq!(reg.get(s).unwrap().canonical(), "a+b+c");
        assert_eq!(reg.get(t).unwrap().canonical(), "a+b+c");
        let l = level(&mut reg, s, t);
        assert!(matches!(l, Level::Identical | Level::Equivalent));
    }

    /// A component written twice is kept once.
    #[test]
    fn disjunction_drops_duplicates() {
        let mut reg = Registry::new(categories());
        reg.define("a: [Label] a; b: [Label] b").unwrap();
        let d = reg.define("a + b + a + (b + a)").unwrap();
        assert_eq!(reg.get(d).unwrap().as_disjunctive().unwrap().len(), 2);
    }

    /// Attribute chains associate to the right and are interned.
    #[test]
    fn attribute_associativity() {
        let mut reg = Registry::new(categories());
        reg.define("a: [Label] a; b: [Label] b; c: [Label] c").unwrap();
        let flat = reg.define("a ^ b ^ c").unwrap();
        let right = reg.define("a ^ (b ^ c)").unwrap();
        let left = reg.define("(a ^ b) ^ c").unwrap();
        assert_eq!(flat, right);
        assert_eq!(flat, left);
        assert_eq!(reg.get(flat).unwrap().canonical(), "a^b^c");
    }

    /// Duplicating under the same name twice yields the same sort.
    #[test]
    fn duplication_idempotence() {
        let mut reg = Registry::new(categories());
        let a = reg.define("[Label] a").unwrap();
        let x = duplicate(&mut reg, a, "x").unwrap();
        assert_eq!(duplicate(&mut reg, x, "x").unwrap(), x);
    }

    /// The aspects example: named views reach their linked sorts and relate
    /// through them.
    #[test]
    fn aspects_relate_through_arguments() {
        let mut reg = Registry::new(categories());
        reg.define("X: [Label] x; Y: [Label] y; Z: [Count] 1; W: [Count] 2").unwrap();
        reg.define("(src, dst): [Relation] (X, Y)").unwrap();
        reg.define("(from, to): [Relation] (Z, W)").unwrap();
        let src = reg.sort_of("src").unwrap();
        let dst = reg.sort_of("dst").unwrap();
        assert_eq!(Some(reg.argument(src).unwrap()), reg.sort_of("X"));
        assert_eq!(reg.category_of(src).unwrap(), Some("Relation"));

        let m = reg.match_sorts(src, dst).unwrap();
        let node = reg.get_match(m).unwrap().clone();
        assert_eq!(node.level(), Level::Convertible);
        assert_eq!(node.stats().swapped, 1);

        let from = reg.sort_of("from").unwrap();
        assert_eq!(level(&mut reg, src, from), Level::Incongruous);
        assert_eq!(level(&mut reg, from, src), Level::Incongruous);
    }

    /// A self-referential definition relates without unbounded recursion.
    #[test]
    fn recursion_safety() {
        let mut reg = Registry::new(categories());
        let a = reg.define("a: [Label] a").unwrap();
        let r = reg.define("r: a ^ r").unwrap();
        let s = reg.define("s: a ^ s").unwrap();
        let t = reg.define("t: a + t").unwrap();
        for _ in 0..1000 {
            for (x, y) in [(r, s), (s, r), (r, t), (t, s)] {
                let m = reg.match_sorts(x, y).unwrap();
                assert!(reg.get_match(m).is_some());
            }
            assert!(contains(&reg, r, a).unwrap());
        }
        assert_eq!(reg.resolve(r).unwrap(), reg.get(r).unwrap().as_recursive().unwrap().instance().unwrap());
        assert!(reg.matches().metrics().cycles_broken > 0);
        assert!(reg.matches().metrics().memo_hits >= 3000);
    }

    /// Twin recursive sorts: the attribute pair keeps its base when the
    /// weight pair is still in progress, the disjunction leaves that pair
    /// unmatched. Both carry a by-name demotion per recursive side.
    #[test]
    fn recursive_twins_have_pinned_levels() {
        let mut reg = Registry::new(categories());
        reg.define("a: [Label] a").unwrap();
        let r = reg.define("r: a ^ r").unwrap();
        let s = reg.define("s: a ^ s").unwrap();
        let m = reg.match_sorts(r, s).unwrap();
        let node = reg.get_match(m).unwrap().clone();
        assert_eq!(node.level(), Level::Incomplete);
        assert_eq!(node.grade(), Grade::Concordant);
        assert_eq!(node.stats().by_name, 2);
        assert_eq!(node.stats().skipped, 1);
        assert_eq!(node.parts().len(), 1);

        let t = reg.define("t: a + t").unwrap();
        let u = reg.define("u: a + u").unwrap();
        let m = reg.match_sorts(t, u).unwrap();
        let node = reg.get_match(m).unwrap();
        assert_eq!(node.level(), Level::Equivalent);
        assert_eq!(node.grade(), Grade::Partial);
        assert_eq!(node.stats().excess, 1);
        assert_eq!(node.stats().omits, 1);
        assert_eq!(node.stats().by_name, 2);
    }

    /// Chains that line up position by position need no swap.
    #[test]
    fn aligned_chains_are_convertible_without_swaps() {
        let mut reg = Registry::new(categories());
        reg.define("f: [Flag]; c: [Label] c; d: [Label] d").unwrap();
        let (fc, fd) = (reg.define("f ^ c").unwrap(), reg.define("f ^ d").unwrap());
        let m = reg.match_sorts(fc, fd).unwrap();
        let node = reg.get_match(m).unwrap().clone();
        assert_eq!(node.level(), Level::Convertible);
        assert_eq!(node.stats().swapped, 0);
        assert_eq!(node.stats().augs, 0);
        assert_eq!(node.stats().by_argument, 1);

        reg.define("a: [Label] a; b: [Label] b").unwrap();
        let abc = reg.define("a ^ b ^ c").unwrap();
        let abd = reg.define("a ^ b ^ d").unwrap();
        let m = reg.match_sorts(abc, abd).unwrap();
        let node = reg.get_match(m).unwrap();
        assert_eq!(node.level(), Level::Convertible);
        assert_eq!(node.stats().swapped, 0);
        assert_eq!(node.stats().by_argument, 1);
    }

    /// A left chain with an extra, unrelated base diminishes onto its weight.
    #[test]
    fn extra_base_is_a_diminution() {
        let mut reg = Registry::new(categories());
        reg.define("a: [Flag]; b: [Label] b; c: [Label] c").unwrap();
        let long = reg.define("a ^ b ^ c").unwrap();
        let short = reg.define("b ^ c").unwrap();
        let m = reg.match_sorts(long, short).unwrap();
        let node = reg.get_match(m).unwrap().clone();
        assert_eq!(node.level(), Level::Incomplete);
        assert_eq!(node.grade(), Grade::Subsumptive);
        assert_eq!(node.stats().dims, 1);
        assert_eq!(node.stats().augs, 0);
        assert_eq!(node.stats().skipped, 1);

        let back = reg.match_sorts(short, long).unwrap();
        let back = reg.get_match(back).unwrap();
        assert_eq!(back.grade(), Grade::PartOf);
        assert_eq!(back.stats().augs, 1);
    }

    /// Aspects of two distinct owners over the same sorts compare slots.
    #[test]
    fn aspects_of_equivalent_owners_compare_slots() {
        let mut reg = Registry::new(categories());
        reg.define("X: [Label] x; Y: [Label] y").unwrap();
        reg.define("(src, dst): [Relation] (X, Y)").unwrap();
        reg.define("(from, to): [Relation] (X, Y)").unwrap();
        let aspect = |reg: &Registry, name: &str| reg.sort_of(name).unwrap();
        let (src, dst) = (aspect(&reg, "src"), aspect(&reg, "dst"));
        let (from, to) = (aspect(&reg, "from"), aspect(&reg, "to"));

        assert_eq!(level(&mut reg, src, from), Level::Equivalent);
        assert_eq!(level(&mut reg, dst, to), Level::Equivalent);

        let m = reg.match_sorts(src, to).unwrap();
        let node = reg.get_match(m).unwrap();
        assert_eq!(node.level(), Level::Convertible);
        assert_eq!(node.stats().swapped, 1);
        assert_eq!(level(&mut reg, to, src), Level::Convertible);
    }

    /// Deep chains relate with recursion depth proportional to their length.
    #[test]
    fn long_chains_relate_on_a_large_stack() {
        let worker = std::thread::Builder::new()
            .stack_size(256 << 20)
            .spawn(|| {
                let mut reg = Registry::new(categories());
                reg.define("p: [Label] a; q: [Label] a").unwrap();
                let left = reg.define(&vec!["p"; 300].join(" ^ ")).unwrap();
                let right = reg.define(&vec!["q"; 300].join(" ^ ")).unwrap();
                let m = reg.match_sorts(left, right).unwrap();
                let node = reg.get_match(m).unwrap();
                (node.level(), node.stats().by_definition)
            })
            .unwrap();
        assert_eq!(worker.join().unwrap(), (Level::StronglySimilar, 300));
    }

    /// A failing session leaves no trace of the definitions before the error.
    #[test]
    fn session_rollback() {
        let mut reg = Registry::new(categories());
        let kept = reg.define("keep: [Flag]").unwrap();
        let err = reg.define_all("X: [Label] x; Y: X + [Flag]; Z: missing").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::UndefinedSort);
        assert!(reg.sort_of("X").is_none());
        assert!(reg.sort_of("Y").is_none());
        assert_eq!(reg.sort_of("keep"), Some(kept));
        assert_eq!(reg.len(), 2);
        let again = reg.define("X: [Label] x").unwrap();
        assert_eq!(reg.sort_of("X"), Some(again));
    }

    /// Rolling back sorts that were matched purges their memo entries.
    #[test]
    fn rollback_purges_matches() {
        let mut reg = Registry::new(categories());
        let a = reg.define("a: [Label] a").unwrap();
        let b = reg.define("b: [Label] b").unwrap();
        reg.match_sorts(a, b).unwrap();
        assert_eq!(reg.matches().memo_len(), 1);
        assert_eq!(reg.undo_new_sorts(), 2);
        assert_eq!(reg.matches().memo_len(), 0);
        assert_eq!(reg.matches().metrics().purged, 1);
        assert!(reg.match_sorts(a, b).is_err());
    }

    /// A handle to a rolled-back sort never resolves to the sort reusing its
    /// slot.
    #[test]
    fn stale_handles_stay_unknown() {
        let mut reg = Registry::new(categories());
        let x = reg.define("x: [Label] x").unwrap();
        assert_eq!(reg.undo_new_sorts(), 2);
        let y = reg.define("y: [Flag]").unwrap();
        assert_ne!(x, y);
        assert!(matches!(reg.get(x), Err(SortError::UnknownSort(_))));
        assert_eq!(reg.display(y).unwrap(), "y");
        assert!(reg.match_sorts(x, y).is_err());
    }

    /// Diagnostics render a caret under the offending token.
    #[test]
    fn diagnostics_render_carets() {
        let mut reg = Registry::new(categories());
        let source = "a: [Label] a;\nb: a ^ nope";
        let err = reg.define(source).unwrap_err();
        assert_eq!(
            err.render(source),
            "undefined sort at 2:8: `nope` is not defined\n  b: a ^ nope\n         ^"
        );
    }

    /// Reports carry display strings and survive CBOR.
    #[test]
    fn reports_describe_the_tree() {
        let config = RegistryConfig::labeled("design");
        let mut reg = Registry::with_config(categories(), config);
        reg.define("a: [Label] a; b: [Label] b; c: [Flag]").unwrap();
        let s = reg.define("s: a + c").unwrap();
        let t = reg.define("t: b + c").unwrap();
        let m = reg.match_sorts(s, t).unwrap();
        let report = reg.report(m).unwrap();
        assert_eq!((report.lhs.as_str(), report.rhs.as_str()), ("s", "t"));
        assert_eq!(report.level, Level::Convertible);
        assert_eq!(report.parts.len(), 1);
        assert_eq!(report.parts[0].lhs, "a");
        let bytes = report.to_cbor().unwrap();
        assert_eq!(MatchReport::from_cbor(&bytes).unwrap(), report);
    }

    /// Without alternatives no tie chain is recorded.
    #[test]
    fn alternatives_can_be_disabled() {
        let config = RegistryConfig {
            keep_alternatives: false,
            ..RegistryConfig::default()
        };
        let mut reg = Registry::with_config(categories(), config);
        let d = reg.define("[Label] a + [Label] b").unwrap();
        let x = reg.define("[Label] x").unwrap();
        let m = reg.match_sorts(d, x).unwrap();
        assert!(reg.get_match(m).unwrap().tied_with().is_none());
        assert_eq!(reg.matches().metrics().alternatives_recorded, 0);

        let mut keeping = Registry::new(categories());
        let d = keeping.define("[Label] a + [Label] b").unwrap();
        let x = keeping.define("[Label] x").unwrap();
        let m = keeping.match_sorts(d, x).unwrap();
        assert!(keeping.get_match(m).unwrap().tied_with().is_some());
    }

    /// Forms are created by the category owner; composites use `*`.
    #[test]
    fn forms_are_forwarded() {
        let table = categories()
            .with_factory("Label", |sort| Box::new(format!("label {}", sort)) as Form)
            .with_factory(crate::category::COMPOSITE_TAG, |_| Box::new("composite") as Form);
        let mut reg = Registry::new(table);
        let a = reg.define("a: [Label] a").unwrap();
        let d = reg.define("a + [Flag]").unwrap();
        let form = reg.new_form(a).unwrap().unwrap();
        assert_eq!(form.downcast_ref::<String>(), Some(&format!("label {}", a)));
        let form = reg.new_form(d).unwrap().unwrap();
        assert_eq!(form.downcast_ref::<&str>(), Some(&"composite"));
        let flag = reg.define("[Flag]").unwrap();
        assert!(reg.new_form(flag).unwrap().is_none());
    }

    /// `cleanup` forgets everything.
    #[test]
    fn cleanup_clears_registry() {
        let mut reg = Registry::new(categories());
        let a = reg.define("a: [Label] a").unwrap();
        reg.match_sorts(a, a).unwrap();
        reg.cleanup();
        assert!(reg.is_empty());
        assert!(reg.sort_of("a").is_none());
        assert!(reg.matches().is_empty());
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    fn atom() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-c]".prop_map(|l| format!("[Label] {}", l)),
            Just("[Flag]".to_string()),
            (0u8..3).prop_map(|n| format!("[Count] {}", n)),
        ]
    }

    fn expression() -> impl Strategy<Value = String> {
        atom().prop_recursive(3, 16, 3, |inner| {
            prop_oneof![
                (atom(), inner.clone()).prop_map(|(base, weight)| format!("{} ^ ({})", base, weight)),
                prop::collection::vec(inner, 2..4).prop_map(|parts| {
                    parts
                        .iter()
                        .map(|p| format!("({})", p))
                        .collect::<Vec<_>>()
                        .join(" + ")
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_reflexive(text in expression()) {
            let mut reg = Registry::new(categories());
            let s = reg.define(&text).unwrap();
            let m = reg.match_sorts(s, s).unwrap();
            let node = reg.get_match(m).unwrap();
            prop_assert_eq!(node.level(), Level::Identical);
            prop_assert_eq!(node.grade(), Grade::Concordant);
        }

        #[test]
        fn prop_symmetric(left in expression(), right in expression()) {
            let mut reg = Registry::new(categories());
            let a = reg.define(&left).unwrap();
            let b = reg.define(&right).unwrap();
            let ab = reg.match_sorts(a, b).unwrap();
            let ba = reg.match_sorts(b, a).unwrap();
            let (ab, ba) = (reg.get_match(ab).unwrap(), reg.get_match(ba).unwrap());
            prop_assert_eq!(ab.level(), ba.level());
            prop_assert_eq!(ab.stats().excess, ba.stats().omits);
            prop_assert_eq!(ab.stats().omits, ba.stats().excess);
            prop_assert_eq!(ab.stats().augs, ba.stats().dims);
            prop_assert_eq!(ab.stats().dims, ba.stats().augs);
            prop_assert_eq!(ab.grade(), ba.grade().reverse());
        }

        #[test]
        fn prop_attribute_associative(x in atom(), y in atom(), z in atom()) {
            let mut reg = Registry::new(categories());
            let flat = reg.define(&format!("{} ^ {} ^ {}", x, y, z)).unwrap();
            let nested = reg.define(&format!("{} ^ ({} ^ {})", x, y, z)).unwrap();
            let grouped = reg.define(&format!("({} ^ {}) ^ {}", x, y, z)).unwrap();
            prop_assert_eq!(flat, nested);
            prop_assert_eq!(flat, grouped);
        }

        #[test]
        fn prop_disjunction_order_independent(
            parts in prop::collection::vec(atom(), 1..5).prop_shuffle()
        ) {
            let mut reg = Registry::new(categories());
            let forward = reg.define(&parts.join(" + ")).unwrap();
            let reversed: Vec<_> = parts.iter().rev().cloned().collect();
            let backward = reg.define(&reversed.join(" + ")).unwrap();
            prop_assert_eq!(
                reg.get(forward).unwrap().canonical(),
                reg.get(backward).unwrap().canonical()
            );
            let m = reg.match_sorts(forward, backward).unwrap();
            prop_assert!(reg.get_match(m).unwrap().level().rank() == 0);
        }
    }
}
