//! Build order over resolved manifests using topological sort.
//!
//! Uses Kahn's algorithm. Ready modules are taken in name order so the
//! result is stable across runs.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, bail};

use super::{Resolution, Target};

/// Order manifests so that every manifest comes after the manifests it
/// depends on, through public or private edges.
///
/// Host modules and unresolved names are ignored, as are self-edges.
///
/// # Errors
/// Returns an error naming the modules involved when the dependencies
/// contain a cycle.
pub fn build_order(resolution: &Resolution) -> Result<Vec<String>> {
    // in_degree[m] = number of manifests m depends on
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for name in resolution.modules.keys() {
        in_degree.insert(name, 0);
        dependents.entry(name.as_str()).or_default();
    }

    for (name, module) in &resolution.modules {
        let mut seen = BTreeSet::new();
        for dep in module.dependencies() {
            if dep.target != Target::Manifest || dep.name == *name || !seen.insert(dep.name.as_str()) {
                continue;
            }
            if !resolution.modules.contains_key(&dep.name) {
                continue;
            }
            if let Some(degree) = in_degree.get_mut(name.as_str()) {
                *degree += 1;
            }
            dependents.entry(dep.name.as_str()).or_default().push(name);
        }
    }

    let mut result = Vec::with_capacity(in_degree.len());
    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(&name, _)| name)
        .collect();

    while let Some(module) = ready.pop_first() {
        result.push(module.to_string());

        if let Some(deps) = dependents.get(module) {
            for dependent in deps {
                if let Some(degree) = in_degree.get_mut(*dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }
    }

    if result.len() != in_degree.len() {
        let placed: BTreeSet<&str> = result.iter().map(String::as_str).collect();
        let in_cycle: Vec<&str> = in_degree
            .keys()
            .copied()
            .filter(|name| !placed.contains(name))
            .collect();

        bail!(
            "circular dependency detected involving modules: {}",
            in_cycle.join(", ")
        );
    }

    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::loader::ManifestSetBuilder;
    use crate::manifest::{BuildConfig, Manifest};
    use crate::registry::HostModuleRegistry;
    use crate::resolver::resolve;

    fn order_of(manifests: Vec<Manifest>) -> Result<Vec<String>> {
        let mut builder = ManifestSetBuilder::new("/plugins");
        for manifest in manifests {
            let path = format!("/plugins/{0}/Source/{0}/{0}.Build.cs", manifest.name);
            builder.insert(manifest.name.clone(), path, manifest);
        }
        let set = builder.build();
        let registry = HostModuleRegistry::from_names(["Core", "Engine"]);
        build_order(&resolve(&set, &registry, &BuildConfig::runtime()))
    }

    #[test]
    fn no_dependencies_sorted_by_name() {
        let order = order_of(vec![
            Manifest::new("c"),
            Manifest::new("a"),
            Manifest::new("b"),
        ])
        .unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn simple_chain() {
        let order = order_of(vec![
            Manifest::new("a").with_public(["b"]),
            Manifest::new("b").with_private(["c"]),
            Manifest::new("c").with_public(["Core"]),
        ])
        .unwrap();
        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[test]
    fn diamond_dependency() {
        let order = order_of(vec![
            Manifest::new("top").with_public(["left", "right"]),
            Manifest::new("left").with_public(["base"]),
            Manifest::new("right").with_private(["base"]),
            Manifest::new("base").with_public(["Engine"]),
        ])
        .unwrap();
        assert_eq!(order, vec!["base", "left", "right", "top"]);
    }

    #[test]
    fn private_cycle_fails() {
        let err = order_of(vec![
            Manifest::new("a").with_private(["b"]),
            Manifest::new("b").with_private(["a"]),
            Manifest::new("c"),
        ])
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "circular dependency detected involving modules: a, b"
        );
    }

    #[test]
    fn self_edge_is_ignored() {
        let order = order_of(vec![Manifest::new("a").with_private(["a"])]).unwrap();
        assert_eq!(order, vec!["a"]);
    }
}
