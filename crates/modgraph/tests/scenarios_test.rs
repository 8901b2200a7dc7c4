#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end resolution scenarios and set-level properties.

mod common;

use modgraph::diagnostics::DiagnosticKind;
use modgraph::graph::DependencyGraph;
use modgraph::manifest::{
    BuildConfig, Condition, ConditionalBlock, DependencyList, Manifest, Predicate, parse_manifest,
    serialize,
};
use modgraph::registry::HostModuleRegistry;
use modgraph::resolver::resolve;
use modgraph::validator::check;
use modgraph_test_utils::{PluginTree, test_manifest};

use common::{fixtures_root, load_set, set_of};

#[test]
fn public_chain_closure_through_host_module() {
    let set = set_of(vec![
        Manifest::new("A").with_public(["B"]),
        Manifest::new("B").with_public(["Host1"]),
    ]);
    let registry = HostModuleRegistry::from_names(["Host1"]);
    let (resolutions, report) = check(&set, &registry, &[BuildConfig::runtime()]);

    let closure: Vec<_> = resolutions[0]
        .public_closure("A")
        .unwrap()
        .iter()
        .cloned()
        .collect();
    assert_eq!(closure, vec!["B", "Host1"]);
    assert!(report.is_empty(), "{}", report.render_text());
}

#[test]
fn public_and_private_overlap_is_one_error() {
    let set = set_of(vec![Manifest::new("A").with_public(["B"]).with_private(["B"])]);
    let registry = HostModuleRegistry::from_names(["B"]);
    let (_, report) = check(&set, &registry, &[BuildConfig::editor(), BuildConfig::runtime()]);

    let overlaps: Vec<_> = report.of_kind(DiagnosticKind::PublicPrivateOverlap).collect();
    assert_eq!(overlaps.len(), 1);
    assert_eq!(overlaps[0].module.as_deref(), Some("A"));
    assert!(overlaps[0].message.contains("'B'"));
    assert!(overlaps[0].is_error());
}

#[test]
fn public_cycle_withholds_closures() {
    let set = set_of(vec![
        Manifest::new("A").with_public(["B"]),
        Manifest::new("B").with_public(["A"]),
    ]);
    let (resolutions, report) = check(&set, &HostModuleRegistry::new(), &[BuildConfig::runtime()]);

    let cycles: Vec<_> = report.of_kind(DiagnosticKind::PublicCycle).collect();
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].message.contains("A, B"));
    assert_eq!(resolutions[0].cycles, vec![vec!["A".to_string(), "B".to_string()]]);
    assert!(resolutions[0].public_closure("A").is_none());
    assert!(resolutions[0].public_closure("B").is_none());
}

#[test]
fn editor_block_applies_only_in_editor_builds() {
    let set = set_of(vec![Manifest::new("A").with_conditional(
        ConditionalBlock::new(Condition::when(Predicate::EditorBuild), 0)
            .with_private(DependencyList::from_names(["EditorOnly"])),
    )]);
    let registry = HostModuleRegistry::from_names(["EditorOnly"]);

    let runtime = resolve(&set, &registry, &BuildConfig::runtime());
    assert!(!runtime.get("A").unwrap().depends_on("EditorOnly"));

    let editor = resolve(&set, &registry, &BuildConfig::editor());
    let a = editor.get("A").unwrap();
    assert!(a.private.iter().any(|d| d.name == "EditorOnly"));
    assert!(a.public.is_empty());
}

#[tokio::test]
async fn duplicate_identifier_keeps_first() {
    let tree = PluginTree::new().unwrap();
    let first = tree
        .add("PluginA", &test_manifest("X").public(&["Core"]))
        .unwrap();
    let second = tree
        .add("PluginB", &test_manifest("X").public(&["Engine"]))
        .unwrap();

    let set = load_set(tree.root()).await;
    assert_eq!(set.len(), 1);
    assert_eq!(set.path_of("X"), Some(first.as_path()));
    assert!(set.manifest("X").unwrap().public.contains("Core"));

    let duplicates: Vec<_> = set
        .diagnostics()
        .iter()
        .filter(|d| d.kind == DiagnosticKind::DuplicateIdentifier)
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert!(duplicates[0].message.contains(&first.display().to_string()));
    assert!(duplicates[0].message.contains(&second.display().to_string()));
    assert_eq!(duplicates[0].path.as_deref(), Some(second.as_path()));
}

#[test]
fn unknown_name_is_one_unresolved_reference() {
    let set = set_of(vec![Manifest::new("A").with_public(["Nope"])]);
    let (_, report) = check(&set, &HostModuleRegistry::new(), &[BuildConfig::runtime()]);
    assert_eq!(report.len(), 1);
    assert_eq!(report.diagnostics()[0].kind, DiagnosticKind::UnresolvedReference);
    assert!(report.diagnostics()[0].message.contains("'Nope'"));
}

#[tokio::test]
async fn fixture_descriptors_round_trip() {
    let set = load_set(&fixtures_root()).await;
    assert_eq!(set.len(), 10);
    for entry in set.entries() {
        let text = serialize(&entry.manifest);
        let dir = entry.path.parent().unwrap();
        let reparsed = parse_manifest(&text, dir).manifest.unwrap();
        assert_eq!(reparsed, entry.manifest, "{}", entry.manifest.name);
    }
}

#[tokio::test]
async fn graph_output_is_deterministic() {
    let registry = HostModuleRegistry::stub();
    let mut outputs = Vec::new();
    for _ in 0..2 {
        let set = load_set(&fixtures_root()).await;
        let resolution = resolve(&set, &registry, &BuildConfig::editor());
        let graph = DependencyGraph::from_resolution(&resolution, &registry);
        outputs.push((graph.to_json().unwrap(), graph.to_dot()));
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn overlap_diagnostic_iff_effective_sets_intersect() {
    let registry = HostModuleRegistry::from_names(["Core", "Engine", "UnrealEd"]);
    let cases = vec![
        Manifest::new("Clean").with_public(["Core"]).with_private(["Engine"]),
        Manifest::new("Base").with_public(["Core"]).with_private(["Core"]),
        Manifest::new("Editor").with_public(["Engine"]).with_conditional(
            ConditionalBlock::new(Condition::when(Predicate::EditorBuild), 0)
                .with_private(DependencyList::from_names(["Engine"])),
        ),
        Manifest::new("Runtime").with_private(["UnrealEd"]).with_conditional(
            ConditionalBlock::new(Condition::unless(Predicate::EditorBuild), 0)
                .with_public(DependencyList::from_names(["UnrealEd"])),
        ),
    ];
    let set = set_of(cases);

    for config in [BuildConfig::editor(), BuildConfig::runtime()] {
        let resolution = resolve(&set, &registry, &config);
        for manifest in set.manifests() {
            let effective = manifest.effective(&config);
            let intersects = effective
                .public
                .iter()
                .any(|d| effective.contains_private(&d.name));
            let reported = resolution.diagnostics.iter().any(|d| {
                d.kind == DiagnosticKind::PublicPrivateOverlap
                    && d.module.as_deref() == Some(manifest.name.as_str())
            });
            assert_eq!(intersects, reported, "{} under {config}", manifest.name);
        }
    }
}

#[test]
fn closure_is_monotone_and_idempotent() {
    let registry = HostModuleRegistry::from_names(["Core", "Engine", "Json"]);
    let before = set_of(vec![
        Manifest::new("A").with_public(["B"]),
        Manifest::new("B").with_public(["Core"]),
        Manifest::new("C").with_public(["Json"]),
    ]);
    let after = set_of(vec![
        Manifest::new("A").with_public(["B"]),
        Manifest::new("B").with_public(["Core", "C"]),
        Manifest::new("C").with_public(["Json"]),
    ]);
    let config = BuildConfig::runtime();

    let first = resolve(&before, &registry, &config);
    let again = resolve(&before, &registry, &config);
    assert_eq!(first.modules, again.modules);

    let grown = resolve(&after, &registry, &config);
    for name in ["A", "B", "C"] {
        let small = first.public_closure(name).unwrap();
        let large = grown.public_closure(name).unwrap();
        assert!(small.is_subset(large), "{name}");
    }
    assert!(grown.public_closure("A").unwrap().contains("Json"));
}

#[test]
fn clean_set_has_no_public_cycle() {
    let set = set_of(vec![
        Manifest::new("A").with_public(["B", "C"]),
        Manifest::new("B").with_public(["C"]).with_private(["A"]),
        Manifest::new("C").with_public(["Core"]),
    ]);
    let registry = HostModuleRegistry::from_names(["Core"]);
    let (resolutions, report) = check(&set, &registry, &[BuildConfig::runtime()]);
    assert!(!report.has_errors());
    assert!(resolutions[0].cycles.is_empty());
    assert!(resolutions[0].modules.values().all(|m| m.public_closure.is_some()));
}
