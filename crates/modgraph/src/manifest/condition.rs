//! Build-configuration predicates and their evaluation.
//!
//! Descriptors guard extra dependencies with checks such as
//! `if (Target.bBuildEditor)`. The parser turns these into declarative
//! [`Condition`] values; the resolver evaluates them later against an
//! explicit [`BuildConfig`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// The closed set of predicates a conditional block may test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Predicate {
    /// The target being built includes the editor.
    EditorBuild,
}

impl Predicate {
    /// Every supported predicate.
    pub const ALL: &'static [Predicate] = &[Predicate::EditorBuild];

    /// Canonical name used in configurations and reports.
    pub fn name(self) -> &'static str {
        match self {
            Predicate::EditorBuild => "editor-build",
        }
    }

    /// Field on the target rules object that carries the flag.
    pub fn target_flag(self) -> &'static str {
        match self {
            Predicate::EditorBuild => "bBuildEditor",
        }
    }

    pub fn from_target_flag(flag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.target_flag() == flag)
    }

    /// Comma-separated list for error messages.
    pub fn supported() -> String {
        Self::ALL
            .iter()
            .map(|p| format!("{} (Target.{})", p.name(), p.target_flag()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Predicate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown predicate '{s}'. Supported: {}", Self::supported()))
    }
}

/// What a conditional block tests: a supported predicate, or an expression
/// kept verbatim so it can be reported and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PredicateRef {
    Known(Predicate),
    Unknown(String),
}

/// A possibly negated predicate guarding a conditional block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    pub predicate: PredicateRef,
    pub negated: bool,
}

impl Condition {
    /// Condition that holds when `predicate` is true.
    pub fn when(predicate: Predicate) -> Self {
        Self {
            predicate: PredicateRef::Known(predicate),
            negated: false,
        }
    }

    /// Condition that holds when `predicate` is false.
    pub fn unless(predicate: Predicate) -> Self {
        Self {
            predicate: PredicateRef::Known(predicate),
            negated: true,
        }
    }

    /// Condition over an expression outside the supported set.
    pub fn unknown(expression: impl Into<String>) -> Self {
        Self {
            predicate: PredicateRef::Unknown(expression.into()),
            negated: false,
        }
    }

    /// The condition of an `else` branch.
    pub fn negate(&self) -> Self {
        match &self.predicate {
            PredicateRef::Known(p) => Self {
                predicate: PredicateRef::Known(*p),
                negated: !self.negated,
            },
            PredicateRef::Unknown(expr) => Self::unknown(format!("!({expr})")),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self.predicate, PredicateRef::Known(_))
    }

    /// True for a block that applies only to editor builds.
    pub fn is_editor_only(&self) -> bool {
        self.predicate == PredicateRef::Known(Predicate::EditorBuild) && !self.negated
    }

    /// Source expression for a target rules parameter named `target`.
    pub fn to_source(&self, target: &str) -> String {
        match &self.predicate {
            PredicateRef::Known(p) if self.negated => format!("!{target}.{}", p.target_flag()),
            PredicateRef::Known(p) => format!("{target}.{}", p.target_flag()),
            PredicateRef::Unknown(expr) => expr.clone(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.predicate {
            PredicateRef::Known(p) if self.negated => write!(f, "!{p}"),
            PredicateRef::Known(p) => write!(f, "{p}"),
            PredicateRef::Unknown(expr) => write!(f, "?({expr})"),
        }
    }
}

/// A valuation of predicates. Predicates without a value are false.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildConfig {
    values: BTreeMap<Predicate, bool>,
}

impl BuildConfig {
    /// Editor build: `editor-build` is true.
    pub fn editor() -> Self {
        Self::default().with(Predicate::EditorBuild, true)
    }

    /// Game/runtime build: `editor-build` is false.
    pub fn runtime() -> Self {
        Self::default().with(Predicate::EditorBuild, false)
    }

    pub fn with(mut self, predicate: Predicate, value: bool) -> Self {
        self.values.insert(predicate, value);
        self
    }

    pub fn get(&self, predicate: Predicate) -> bool {
        self.values.get(&predicate).copied().unwrap_or(false)
    }

    /// Evaluate a block condition. Unknown predicates never apply.
    pub fn evaluate(&self, condition: &Condition) -> bool {
        match &condition.predicate {
            PredicateRef::Known(p) => self.get(*p) != condition.negated,
            PredicateRef::Unknown(_) => false,
        }
    }

    /// Short label: `editor`, `runtime`, or the explicit valuation.
    pub fn label(&self) -> String {
        if *self == Self::editor() {
            "editor".to_string()
        } else if *self == Self::runtime() {
            "runtime".to_string()
        } else {
            self.values
                .iter()
                .map(|(p, v)| format!("{p}={v}"))
                .collect::<Vec<_>>()
                .join(",")
        }
    }
}

impl fmt::Display for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
