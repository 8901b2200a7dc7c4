#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Property-based tests for manifest and resolution laws.
//!
//! Uses proptest to check that serialization round-trips and that
//! resolution results hold for arbitrary small manifest sets.

mod common;

use std::collections::BTreeSet;
use std::path::Path;

use modgraph::diagnostics::DiagnosticKind;
use modgraph::graph::DependencyGraph;
use modgraph::manifest::{
    BuildConfig, Condition, ConditionalBlock, Dependency, DependencyList, Manifest, PchUsage,
    Predicate, UnknownField, parse_manifest, serialize,
};
use modgraph::registry::HostModuleRegistry;
use modgraph::resolver::resolve;
use modgraph::validator::check;
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::select;

use common::set_of;

/// Expressions outside the supported predicate set.
const UNKNOWN_CONDITIONS: &[&str] = &[
    "Target.bBuildDeveloperTools",
    "Target.Platform == UnrealTargetPlatform.Win64",
    "Target.bWithServerCode && Target.bBuildEditor",
];

/// (key, statement) pairs the parser keeps verbatim.
const UNKNOWN_FIELDS: &[(&str, &str)] = &[
    ("bEnforceIWYU", "bEnforceIWYU = true;"),
    ("PublicIncludePaths.Add", "PublicIncludePaths.Add(ModuleDirectory);"),
    ("CppStandard", "CppStandard = CppStandardVersion.Cpp20;"),
    ("OptimizeCode", "OptimizeCode = CodeOptimization.InShippingBuildsOnly;"),
];

/// Manifest identifiers in generated sets.
const SET_NAMES: &[&str] = &["A", "B", "C", "D", "E"];

/// Dependency names in generated sets: manifests, host modules and one
/// name that resolves to nothing.
const DEPENDENCY_POOL: &[&str] = &["A", "B", "C", "D", "E", "Core", "Engine", "UnrealEd", "Missing"];

fn registry() -> HostModuleRegistry {
    HostModuleRegistry::from_names(["Core", "Engine"]).with_editor_only(["UnrealEd"])
}

fn both() -> Vec<BuildConfig> {
    vec![BuildConfig::editor(), BuildConfig::runtime()]
}

fn module_name() -> impl Strategy<Value = String> {
    "[A-Z][A-Za-z0-9_]{0,15}"
}

fn condition() -> impl Strategy<Value = Condition> {
    prop_oneof![
        Just(Condition::when(Predicate::EditorBuild)),
        Just(Condition::unless(Predicate::EditorBuild)),
        select(UNKNOWN_CONDITIONS).prop_map(Condition::unknown),
    ]
}

fn unknown_fields() -> impl Strategy<Value = Vec<UnknownField>> {
    vec(select(UNKNOWN_FIELDS), 0..3).prop_map(|fields| {
        fields
            .into_iter()
            .map(|(key, raw)| UnknownField {
                key: key.to_string(),
                raw: raw.to_string(),
                line: 0,
            })
            .collect()
    })
}

fn conditional_block() -> impl Strategy<Value = ConditionalBlock> {
    (
        condition(),
        vec(module_name(), 0..4),
        vec(module_name(), 0..4),
        unknown_fields(),
    )
        .prop_map(|(condition, public, private, unknown)| {
            let mut block = ConditionalBlock::new(condition, 0)
                .with_public(DependencyList::from_names(public))
                .with_private(DependencyList::from_names(private));
            block.unknown = unknown;
            block
        })
}

fn manifest() -> impl Strategy<Value = Manifest> {
    (
        module_name(),
        select(PchUsage::ALL),
        vec(module_name(), 0..6),
        vec(module_name(), 0..6),
        vec(conditional_block(), 0..3),
        unknown_fields(),
    )
        .prop_map(|(name, pch, public, private, conditionals, unknown)| {
            let mut manifest = Manifest::new(name).with_public(public).with_private(private);
            manifest.pch_usage = pch;
            manifest.conditionals = conditionals;
            manifest.unknown = unknown;
            manifest
        })
}

fn pool_names() -> impl Strategy<Value = Vec<&'static str>> {
    vec(select(DEPENDENCY_POOL), 0..4)
}

fn small_manifest() -> impl Strategy<Value = Manifest> {
    (
        select(SET_NAMES),
        pool_names(),
        pool_names(),
        vec((condition(), pool_names(), pool_names()), 0..3),
    )
        .prop_map(|(name, public, private, blocks)| {
            blocks.into_iter().fold(
                Manifest::new(name).with_public(public).with_private(private),
                |manifest, (condition, public, private)| {
                    manifest.with_conditional(
                        ConditionalBlock::new(condition, 0)
                            .with_public(DependencyList::from_names(public))
                            .with_private(DependencyList::from_names(private)),
                    )
                },
            )
        })
}

/// Up to five manifests with distinct identifiers.
fn small_set() -> impl Strategy<Value = Vec<Manifest>> {
    vec(small_manifest(), 0..6).prop_map(|manifests| {
        let mut seen = BTreeSet::new();
        manifests
            .into_iter()
            .filter(|m| seen.insert(m.name.clone()))
            .collect()
    })
}

/// Property: serialized manifests parse back to an equal manifest
proptest! {
    #[test]
    fn prop_serialize_round_trip(manifest in manifest()) {
        let module_dir = Path::new("Plugins/P/Source").join(&manifest.name);
        let text = serialize(&manifest);
        let outcome = parse_manifest(&text, &module_dir);
        prop_assert_eq!(outcome.manifest, Some(manifest), "{}", text);
    }
}

/// Property: graphs and reports do not depend on insertion order
proptest! {
    #[test]
    fn prop_output_independent_of_insertion_order(manifests in small_set()) {
        let registry = registry();
        let mut reversed = manifests.clone();
        reversed.reverse();
        let forward = set_of(manifests);
        let backward = set_of(reversed);

        for config in both() {
            let a = DependencyGraph::from_resolution(&resolve(&forward, &registry, &config), &registry);
            let b = DependencyGraph::from_resolution(&resolve(&backward, &registry, &config), &registry);
            prop_assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
            prop_assert_eq!(a.to_dot(), b.to_dot());
        }

        let (_, a) = check(&forward, &registry, &both());
        let (_, b) = check(&backward, &registry, &both());
        prop_assert_eq!(a.render_text(), b.render_text());
    }
}

/// Property: one overlap diagnostic per name shared by the effective sets
proptest! {
    #[test]
    fn prop_overlap_reported_iff_effective_sets_intersect(manifests in small_set()) {
        let set = set_of(manifests);
        let registry = registry();
        for config in both() {
            let resolution = resolve(&set, &registry, &config);
            for manifest in set.manifests() {
                let effective = manifest.effective(&config);
                let shared = effective
                    .public
                    .iter()
                    .filter(|d| effective.contains_private(&d.name))
                    .count();
                let reported = resolution
                    .diagnostics
                    .iter()
                    .filter(|d| {
                        d.kind == DiagnosticKind::PublicPrivateOverlap
                            && d.module.as_deref() == Some(manifest.name.as_str())
                    })
                    .count();
                prop_assert_eq!(reported, shared, "{} under {}", manifest.name, config);
            }
        }
    }
}

/// Property: the closure of anything in a closure stays inside it
proptest! {
    #[test]
    fn prop_closure_is_idempotent(manifests in small_set()) {
        let set = set_of(manifests);
        for config in both() {
            let resolution = resolve(&set, &registry(), &config);
            for module in resolution.modules.values() {
                let Some(closure) = &module.public_closure else {
                    continue;
                };
                for member in closure {
                    if let Some(inner) = resolution.public_closure(member) {
                        prop_assert!(inner.is_subset(closure), "{} via {}", module.name, member);
                    }
                }
            }
        }
    }
}

/// Property: adding a public edge never shrinks a closure
proptest! {
    #[test]
    fn prop_closure_is_monotone_under_added_public_edges(
        manifests in small_set(),
        from in select(SET_NAMES),
        to in select(DEPENDENCY_POOL),
    ) {
        let before = set_of(manifests.clone());
        let mut extended = manifests;
        if let Some(manifest) = extended.iter_mut().find(|m| m.name == from) {
            manifest.public.push(Dependency::new(to, 0));
        }
        let after = set_of(extended);

        for config in both() {
            let old = resolve(&before, &registry(), &config);
            let new = resolve(&after, &registry(), &config);
            for (name, module) in &old.modules {
                if let (Some(smaller), Some(larger)) = (&module.public_closure, new.public_closure(name)) {
                    prop_assert!(smaller.is_subset(larger), "{} after {} -> {}", name, from, to);
                }
            }
        }
    }
}
