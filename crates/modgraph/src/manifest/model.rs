//! The plugin module manifest: one record per build descriptor.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::condition::{BuildConfig, Condition};

/// File-name suffix of a build descriptor (`<Module>.Build.cs`).
pub const MANIFEST_SUFFIX: &str = ".Build.cs";

/// Precompiled-header policy of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PchUsage {
    Default,
    UseSharedPCHs,
    UseExplicitOrSharedPCHs,
    NoSharedPCHs,
    NoPCHs,
}

impl PchUsage {
    pub const ALL: &'static [PchUsage] = &[
        PchUsage::Default,
        PchUsage::UseSharedPCHs,
        PchUsage::UseExplicitOrSharedPCHs,
        PchUsage::NoSharedPCHs,
        PchUsage::NoPCHs,
    ];

    /// Enumerant name as written after `PCHUsageMode.`.
    pub fn as_str(self) -> &'static str {
        match self {
            PchUsage::Default => "Default",
            PchUsage::UseSharedPCHs => "UseSharedPCHs",
            PchUsage::UseExplicitOrSharedPCHs => "UseExplicitOrSharedPCHs",
            PchUsage::NoSharedPCHs => "NoSharedPCHs",
            PchUsage::NoPCHs => "NoPCHs",
        }
    }
}

impl fmt::Display for PchUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PchUsage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                Self::ALL
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
    }
}

/// Whether a dependency is re-exported to dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A module name as written in a dependency list.
///
/// The line is where the name appeared; it is not part of equality.
#[derive(Debug, Clone, Eq)]
pub struct Dependency {
    pub name: String,
    pub line: usize,
}

impl Dependency {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line,
        }
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Dependency names in source order, without duplicates.
///
/// Two lists are equal when they hold the same names in any order.
#[derive(Debug, Clone, Default, Eq)]
pub struct DependencyList {
    entries: Vec<Dependency>,
}

impl DependencyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::new();
        for name in names {
            list.push(Dependency::new(name, 0));
        }
        list
    }

    /// Append `dependency`. Returns false if the name was already present.
    pub fn push(&mut self, dependency: Dependency) -> bool {
        if self.contains(&dependency.name) {
            return false;
        }
        self.entries.push(dependency);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|d| d.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.entries.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dependency> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for DependencyList {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.names().all(|n| other.contains(n))
    }
}

impl<'a> IntoIterator for &'a DependencyList {
    type Item = &'a Dependency;
    type IntoIter = std::slice::Iter<'a, Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A statement the parser did not recognize, kept verbatim.
#[derive(Debug, Clone, Eq)]
pub struct UnknownField {
    /// Leading dotted name of the statement (e.g. `bEnforceIWYU`).
    pub key: String,
    /// Source text of the whole statement, including the trailing `;`.
    pub raw: String,
    pub line: usize,
}

impl PartialEq for UnknownField {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.raw == other.raw
    }
}

/// Dependencies added only when `condition` holds.
#[derive(Debug, Clone, Eq)]
pub struct ConditionalBlock {
    pub condition: Condition,
    pub public: DependencyList,
    pub private: DependencyList,
    pub unknown: Vec<UnknownField>,
    pub line: usize,
}

impl ConditionalBlock {
    pub fn new(condition: Condition, line: usize) -> Self {
        Self {
            condition,
            public: DependencyList::new(),
            private: DependencyList::new(),
            unknown: Vec::new(),
            line,
        }
    }

    pub fn with_public(mut self, public: DependencyList) -> Self {
        self.public = public;
        self
    }

    pub fn with_private(mut self, private: DependencyList) -> Self {
        self.private = private;
        self
    }

    /// True when the block adds no dependencies.
    pub fn is_empty(&self) -> bool {
        self.public.is_empty() && self.private.is_empty()
    }
}

impl PartialEq for ConditionalBlock {
    fn eq(&self, other: &Self) -> bool {
        self.condition == other.condition
            && self.public == other.public
            && self.private == other.private
            && self.unknown == other.unknown
    }
}

/// A derived view of one dependency relation declared by a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyEdge<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub visibility: Visibility,
    /// `None` for the base block.
    pub condition: Option<&'a Condition>,
    pub line: usize,
}

/// A dependency that applies under a given build configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveDependency {
    pub name: String,
    pub line: usize,
    /// Block that first contributed the name; `None` for the base block.
    pub condition: Option<Condition>,
}

/// Public and private dependencies after applying conditional blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveDependencies {
    pub public: Vec<EffectiveDependency>,
    pub private: Vec<EffectiveDependency>,
}

impl EffectiveDependencies {
    fn add(list: &mut Vec<EffectiveDependency>, dep: &Dependency, condition: Option<&Condition>) {
        if list.iter().any(|e| e.name == dep.name) {
            return;
        }
        list.push(EffectiveDependency {
            name: dep.name.clone(),
            line: dep.line,
            condition: condition.cloned(),
        });
    }

    pub fn contains_public(&self, name: &str) -> bool {
        self.public.iter().any(|d| d.name == name)
    }

    pub fn contains_private(&self, name: &str) -> bool {
        self.private.iter().any(|d| d.name == name)
    }
}

/// One plugin module's dependency declaration.
#[derive(Debug, Clone, Eq)]
pub struct Manifest {
    /// Module identifier; equals the enclosing directory name.
    pub name: String,
    pub pch_usage: PchUsage,
    pub public: DependencyList,
    pub private: DependencyList,
    /// Applied after the base lists, in source order.
    pub conditionals: Vec<ConditionalBlock>,
    /// Unrecognized base-block statements.
    pub unknown: Vec<UnknownField>,
    /// Line of the class declaration.
    pub line: usize,
}

impl Manifest {
    /// A manifest with no dependencies and the shared PCH policy.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pch_usage: PchUsage::UseExplicitOrSharedPCHs,
            public: DependencyList::new(),
            private: DependencyList::new(),
            conditionals: Vec::new(),
            unknown: Vec::new(),
            line: 0,
        }
    }

    pub fn with_public<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public = DependencyList::from_names(names);
        self
    }

    pub fn with_private<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.private = DependencyList::from_names(names);
        self
    }

    pub fn with_conditional(mut self, block: ConditionalBlock) -> Self {
        self.conditionals.push(block);
        self
    }

    /// Every declared edge: base block first, then each conditional block.
    pub fn edges(&self) -> Vec<DependencyEdge<'_>> {
        let mut edges = Vec::new();
        let from = self.name.as_str();
        push_edges(&mut edges, from, &self.public, Visibility::Public, None);
        push_edges(&mut edges, from, &self.private, Visibility::Private, None);
        for block in &self.conditionals {
            let condition = Some(&block.condition);
            push_edges(&mut edges, from, &block.public, Visibility::Public, condition);
            push_edges(&mut edges, from, &block.private, Visibility::Private, condition);
        }
        edges
    }

    /// Base lists unioned with every conditional block that holds under
    /// `config`, in source order.
    pub fn effective(&self, config: &BuildConfig) -> EffectiveDependencies {
        let mut effective = EffectiveDependencies::default();
        for dep in &self.public {
            EffectiveDependencies::add(&mut effective.public, dep, None);
        }
        for dep in &self.private {
            EffectiveDependencies::add(&mut effective.private, dep, None);
        }
        for block in self
            .conditionals
            .iter()
            .filter(|b| config.evaluate(&b.condition))
        {
            for dep in &block.public {
                EffectiveDependencies::add(&mut effective.public, dep, Some(&block.condition));
            }
            for dep in &block.private {
                EffectiveDependencies::add(&mut effective.private, dep, Some(&block.condition));
            }
        }
        effective
    }
}

fn push_edges<'a>(
    edges: &mut Vec<DependencyEdge<'a>>,
    from: &'a str,
    list: &'a DependencyList,
    visibility: Visibility,
    condition: Option<&'a Condition>,
) {
    edges.extend(list.iter().map(|dep| DependencyEdge {
        from,
        to: dep.name.as_str(),
        visibility,
        condition,
        line: dep.line,
    }));
}

impl PartialEq for Manifest {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.pch_usage == other.pch_usage
            && self.public == other.public
            && self.private == other.private
            && self.conditionals == other.conditionals
            && self.unknown == other.unknown
    }
}
