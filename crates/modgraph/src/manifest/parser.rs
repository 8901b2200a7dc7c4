//! Parser for `<Module>.Build.cs` descriptors.
//!
//! Each descriptor declares one class deriving from `ModuleRules` whose
//! constructor assigns a PCH policy and appends to the public and private
//! dependency lists, optionally inside `if (Target.bBuildEditor)` blocks.
//! The parser turns that into a pure [`Manifest`] value; nothing is
//! evaluated here.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::condition::{Condition, Predicate};
use super::lexer::{Token, TokenKind, tokenize};
use super::model::{
    ConditionalBlock, Dependency, DependencyList, MANIFEST_SUFFIX, Manifest, PchUsage,
    UnknownField, Visibility,
};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::ParseError;

/// Field receiving public dependency names.
pub const PUBLIC_DEPENDENCIES: &str = "PublicDependencyModuleNames";
/// Field receiving private dependency names.
pub const PRIVATE_DEPENDENCIES: &str = "PrivateDependencyModuleNames";

/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static MODULE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex literal"));

/// Whether `name` can name a module.
pub fn is_valid_module_name(name: &str) -> bool {
    MODULE_NAME.is_match(name)
}

/// Result of parsing one descriptor.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// `None` when the descriptor was malformed.
    pub manifest: Option<Manifest>,
    /// Warnings, plus the fatal error when `manifest` is `None`.
    pub diagnostics: Vec<Diagnostic>,
    /// Path of the descriptor file the diagnostics refer to.
    pub path: PathBuf,
}

/// Parse descriptor text found in `module_dir`.
///
/// The declared class must match the directory name.
pub fn parse_manifest(content: &str, module_dir: &Path) -> ParseOutcome {
    let (directory, path) = descriptor_location(module_dir);
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut diagnostics = Vec::new();
    let result = tokenize(content).and_then(|tokens| {
        let mut parser = Parser {
            src: content,
            tokens,
            pos: 0,
            path: &path,
            module: directory.clone(),
            diagnostics: Vec::new(),
        };
        let result = parser.parse_module(&directory);
        diagnostics.append(&mut parser.diagnostics);
        result
    });

    match result {
        Ok(manifest) => ParseOutcome {
            manifest: Some(manifest),
            diagnostics,
            path,
        },
        Err(err) => failed(&err, &directory, path, diagnostics),
    }
}

/// Parse descriptor bytes as read from disk. Bytes that are not UTF-8
/// fail this descriptor only.
pub fn parse_manifest_bytes(bytes: &[u8], module_dir: &Path) -> ParseOutcome {
    match std::str::from_utf8(bytes) {
        Ok(content) => parse_manifest(content, module_dir),
        Err(e) => {
            let (directory, path) = descriptor_location(module_dir);
            let line = bytes[..e.valid_up_to()].iter().filter(|b| **b == b'\n').count() + 1;
            failed(&ParseError::InvalidEncoding { line }, &directory, path, Vec::new())
        }
    }
}

/// Module identifier and descriptor path for `module_dir`.
fn descriptor_location(module_dir: &Path) -> (String, PathBuf) {
    let directory = module_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let path = module_dir.join(format!("{directory}{MANIFEST_SUFFIX}"));
    (directory, path)
}

fn failed(err: &ParseError, directory: &str, path: PathBuf, mut diagnostics: Vec<Diagnostic>) -> ParseOutcome {
    let mut diagnostic = Diagnostic::new(DiagnosticKind::ParseError, err.to_string())
        .for_module(directory)
        .in_file(&path);
    diagnostic.line = err.line();
    diagnostics.push(diagnostic);
    ParseOutcome {
        manifest: None,
        diagnostics,
        path,
    }
}

/// What a single statement turned out to be.
enum Statement {
    Pch(PchUsage),
    Dependencies {
        visibility: Visibility,
        names: Vec<(String, usize)>,
    },
    Unknown(UnknownField),
}

/// Lists being filled while walking one block.
#[derive(Default)]
struct Block {
    public: DependencyList,
    private: DependencyList,
    unknown: Vec<UnknownField>,
}

#[derive(Default)]
struct Body {
    pch: Option<PchUsage>,
    base: Block,
    conditionals: Vec<(Condition, usize, Block)>,
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    path: &'a Path,
    module: String,
    diagnostics: Vec<Diagnostic>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self, expected: &str) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| ParseError::eof(expected))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect_punct(&mut self, c: char) -> Result<usize, ParseError> {
        let expected = format!("'{c}'");
        let token = self.next(&expected)?;
        if token.is_punct(c) {
            Ok(token.line)
        } else {
            Err(ParseError::unexpected(token.line, expected, token.kind.to_string()))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, usize), ParseError> {
        let token = self.next(what)?;
        match token.kind {
            TokenKind::Ident(name) => Ok((name, token.line)),
            other => Err(ParseError::unexpected(token.line, what, other.to_string())),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<usize, ParseError> {
        let expected = format!("'{keyword}'");
        let token = self.next(&expected)?;
        if token.is_ident(keyword) {
            Ok(token.line)
        } else {
            Err(ParseError::unexpected(token.line, expected, token.kind.to_string()))
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_ident(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_modifiers(&mut self) {
        while ["public", "sealed", "partial", "internal"]
            .iter()
            .any(|m| self.eat_keyword(m))
        {}
    }

    fn warn(&mut self, kind: DiagnosticKind, line: usize, message: String) {
        self.diagnostics.push(
            Diagnostic::new(kind, message)
                .for_module(&self.module)
                .at(self.path, line),
        );
    }

    fn parse_module(&mut self, directory: &str) -> Result<Manifest, ParseError> {
        while self.eat_keyword("using") {
            while !self.next("';'")?.is_punct(';') {}
        }

        self.skip_modifiers();
        self.expect_keyword("class")?;
        let (name, line) = self.expect_ident("module class name")?;
        self.expect_punct(':')?;
        let (base, base_line) = self.expect_ident("'ModuleRules'")?;
        if base != "ModuleRules" {
            return Err(ParseError::unexpected(base_line, "'ModuleRules'", format!("'{base}'")));
        }
        if name != directory {
            return Err(ParseError::IdentifierMismatch {
                class: name,
                directory: directory.to_string(),
                line,
            });
        }
        self.module = name.clone();

        self.expect_punct('{')?;
        let body = self.parse_constructor(&name)?;
        self.expect_punct('}')?;
        if let Some(token) = self.peek() {
            return Err(ParseError::unexpected(
                token.line,
                "end of file",
                token.kind.to_string(),
            ));
        }

        let pch_usage = body
            .pch
            .ok_or_else(|| ParseError::MissingPchUsage { module: name.clone() })?;

        Ok(Manifest {
            name,
            pch_usage,
            public: body.base.public,
            private: body.base.private,
            conditionals: body
                .conditionals
                .into_iter()
                .map(|(condition, line, block)| ConditionalBlock {
                    condition,
                    public: block.public,
                    private: block.private,
                    unknown: block.unknown,
                    line,
                })
                .collect(),
            unknown: body.base.unknown,
            line,
        })
    }

    /// `public Name(ReadOnlyTargetRules Target) : base(Target) { ... }`
    fn parse_constructor(&mut self, class: &str) -> Result<Body, ParseError> {
        self.skip_modifiers();
        let (found, line) = self.expect_ident("constructor")?;
        if found != class {
            return Err(ParseError::ConstructorMismatch {
                class: class.to_string(),
                found,
                line,
            });
        }
        self.expect_punct('(')?;
        let (rules, rules_line) = self.expect_ident("'ReadOnlyTargetRules'")?;
        if rules != "ReadOnlyTargetRules" {
            return Err(ParseError::unexpected(
                rules_line,
                "'ReadOnlyTargetRules'",
                format!("'{rules}'"),
            ));
        }
        let (target, _) = self.expect_ident("target parameter name")?;
        self.expect_punct(')')?;
        self.expect_punct(':')?;
        self.expect_keyword("base")?;
        self.expect_punct('(')?;
        let (forwarded, forwarded_line) = self.expect_ident("target parameter name")?;
        if forwarded != target {
            return Err(ParseError::unexpected(
                forwarded_line,
                format!("'{target}'"),
                format!("'{forwarded}'"),
            ));
        }
        self.expect_punct(')')?;
        self.expect_punct('{')?;

        let mut body = Body::default();
        self.parse_statements(&target, &mut body, None)?;
        self.expect_punct('}')?;
        Ok(body)
    }

    /// Parse statements up to (not including) the closing `}`.
    /// `conditional` is the index of the enclosing conditional block.
    fn parse_statements(
        &mut self,
        target: &str,
        body: &mut Body,
        conditional: Option<usize>,
    ) -> Result<(), ParseError> {
        loop {
            let Some(token) = self.peek() else {
                return Err(ParseError::eof("'}'"));
            };
            if token.is_punct('}') {
                return Ok(());
            }
            if token.is_punct(';') {
                self.pos += 1;
                continue;
            }
            if token.is_ident("if") {
                if conditional.is_some() {
                    return Err(ParseError::NestedConditional { line: token.line });
                }
                self.parse_conditional(target, body)?;
                continue;
            }
            self.parse_statement(body, conditional)?;
        }
    }

    fn parse_conditional(&mut self, target: &str, body: &mut Body) -> Result<(), ParseError> {
        let line = self.expect_keyword("if")?;
        self.expect_punct('(')?;
        let expr = self.take_parenthesized()?;
        let condition = self.condition_from(&expr, target);

        body.conditionals.push((condition.clone(), line, Block::default()));
        self.parse_branch(target, body, body.conditionals.len() - 1)?;

        if self.peek().is_some_and(|t| t.is_ident("else")) {
            let else_line = self.expect_keyword("else")?;
            if self.peek().is_some_and(|t| t.is_ident("if")) {
                return Err(ParseError::ElseIfChain { line: else_line });
            }
            body.conditionals
                .push((condition.negate(), else_line, Block::default()));
            self.parse_branch(target, body, body.conditionals.len() - 1)?;
        }
        Ok(())
    }

    fn parse_branch(&mut self, target: &str, body: &mut Body, index: usize) -> Result<(), ParseError> {
        if self.peek().is_some_and(|t| t.is_punct('{')) {
            self.pos += 1;
            self.parse_statements(target, body, Some(index))?;
            self.expect_punct('}')?;
            return Ok(());
        }
        if let Some(token) = self.peek()
            && token.is_ident("if")
        {
            return Err(ParseError::NestedConditional { line: token.line });
        }
        self.parse_statement(body, Some(index))
    }

    /// Tokens of a parenthesized expression; the opening `(` is consumed
    /// already, the matching `)` is consumed here.
    fn take_parenthesized(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut depth = 0usize;
        let mut tokens = Vec::new();
        loop {
            let token = self.next("')'")?;
            if token.is_punct('(') {
                depth += 1;
            } else if token.is_punct(')') {
                if depth == 0 {
                    return Ok(tokens);
                }
                depth -= 1;
            }
            tokens.push(token);
        }
    }

    fn condition_from(&self, expr: &[Token], target: &str) -> Condition {
        let flag = |tokens: &[Token]| -> Option<Predicate> {
            match strip_parens(tokens) {
                [t, dot, f] if t.is_ident(target) && dot.is_punct('.') => {
                    f.ident().and_then(Predicate::from_target_flag)
                }
                _ => None,
            }
        };

        let inner = strip_parens(expr);
        let known = match inner {
            [bang, rest @ ..] if bang.is_punct('!') => flag(rest).map(Condition::unless),
            [_, _, _, op, value] if op.is_op("==") || op.is_op("!=") => {
                let predicate = flag(&inner[..3]);
                let truth = if value.is_ident("true") {
                    Some(true)
                } else if value.is_ident("false") {
                    Some(false)
                } else {
                    None
                };
                match (predicate, truth) {
                    (Some(p), Some(truth)) if truth == op.is_op("==") => Some(Condition::when(p)),
                    (Some(p), Some(_)) => Some(Condition::unless(p)),
                    _ => None,
                }
            }
            _ => flag(inner).map(Condition::when),
        };

        known.unwrap_or_else(|| Condition::unknown(self.source_of(expr)))
    }

    fn source_of(&self, tokens: &[Token]) -> String {
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => self.src[first.start..last.end].to_string(),
            _ => String::new(),
        }
    }

    /// Consume one statement up to its terminating `;` and apply it.
    fn parse_statement(&mut self, body: &mut Body, conditional: Option<usize>) -> Result<(), ParseError> {
        let mut depth = 0usize;
        let mut tokens = Vec::new();
        loop {
            let token = self.next("';'")?;
            if token.is_punct('(') || token.is_punct('{') || token.is_punct('[') {
                depth += 1;
            } else if token.is_punct(')') || token.is_punct('}') || token.is_punct(']') {
                if depth == 0 {
                    return Err(ParseError::unexpected(token.line, "';'", token.kind.to_string()));
                }
                depth -= 1;
            }
            let done = depth == 0 && token.is_punct(';');
            tokens.push(token);
            if done {
                break;
            }
        }

        let line = tokens.first().map(|t| t.line).unwrap_or_default();
        match self.classify(&tokens)? {
            Statement::Pch(pch) => {
                if conditional.is_some() {
                    return Err(ParseError::PchInConditional { line });
                }
                if let Some(previous) = body.pch.replace(pch) {
                    self.warn(
                        DiagnosticKind::DuplicateEntry,
                        line,
                        format!("PCHUsage assigned more than once; '{pch}' replaces '{previous}'"),
                    );
                }
            }
            Statement::Dependencies { visibility, names } => {
                let field = match visibility {
                    Visibility::Public => PUBLIC_DEPENDENCIES,
                    Visibility::Private => PRIVATE_DEPENDENCIES,
                };
                for (name, name_line) in names {
                    if !is_valid_module_name(&name) {
                        return Err(ParseError::InvalidModuleName { line: name_line, name });
                    }
                    let block = match conditional {
                        Some(index) => &mut body.conditionals[index].2,
                        None => &mut body.base,
                    };
                    let list = match visibility {
                        Visibility::Public => &mut block.public,
                        Visibility::Private => &mut block.private,
                    };
                    if !list.push(Dependency::new(&name, name_line)) {
                        let message = format!("'{name}' listed more than once in {field}");
                        self.warn(DiagnosticKind::DuplicateEntry, name_line, message);
                    }
                }
            }
            Statement::Unknown(field) => {
                self.warn(
                    DiagnosticKind::UnknownField,
                    field.line,
                    format!("unrecognized field '{}' preserved verbatim", field.key),
                );
                match conditional {
                    Some(index) => body.conditionals[index].2.unknown.push(field),
                    None => body.base.unknown.push(field),
                }
            }
        }
        Ok(())
    }

    fn classify(&self, tokens: &[Token]) -> Result<Statement, ParseError> {
        if let [field, eq, mode_type, dot, mode, semi] = tokens
            && field.is_ident("PCHUsage")
            && eq.is_punct('=')
            && mode_type.is_ident("PCHUsageMode")
            && dot.is_punct('.')
            && semi.is_punct(';')
        {
            let value = mode.ident().unwrap_or_default();
            return value.parse::<PchUsage>().map(Statement::Pch).map_err(|valid| {
                ParseError::UnknownPchUsage {
                    line: mode.line,
                    value: value.to_string(),
                    valid,
                }
            });
        }

        if let [field, dot, method, open, args @ .., close, semi] = tokens
            && dot.is_punct('.')
            && open.is_punct('(')
            && close.is_punct(')')
            && semi.is_punct(';')
        {
            let visibility = if field.is_ident(PUBLIC_DEPENDENCIES) {
                Some(Visibility::Public)
            } else if field.is_ident(PRIVATE_DEPENDENCIES) {
                Some(Visibility::Private)
            } else {
                None
            };
            let names = if method.is_ident("Add") {
                single_string(args)
            } else if method.is_ident("AddRange") {
                string_array(args)
            } else {
                None
            };
            if let (Some(visibility), Some(names)) = (visibility, names) {
                return Ok(Statement::Dependencies { visibility, names });
            }
        }

        Ok(Statement::Unknown(UnknownField {
            key: statement_key(tokens),
            raw: self.source_of(tokens),
            line: tokens.first().map(|t| t.line).unwrap_or_default(),
        }))
    }
}

/// `expr` without parentheses that enclose all of it.
fn strip_parens(mut expr: &[Token]) -> &[Token] {
    loop {
        match expr {
            [open, inner @ .., close] if open.is_punct('(') && close.is_punct(')') && balanced(inner) => {
                expr = inner;
            }
            _ => return expr,
        }
    }
}

/// Whether every parenthesis in `tokens` is matched within it.
fn balanced(tokens: &[Token]) -> bool {
    let mut depth = 0usize;
    for token in tokens {
        if token.is_punct('(') {
            depth += 1;
        } else if token.is_punct(')') {
            let Some(d) = depth.checked_sub(1) else {
                return false;
            };
            depth = d;
        }
    }
    depth == 0
}

/// `("Name")`
fn single_string(args: &[Token]) -> Option<Vec<(String, usize)>> {
    match args {
        [Token {
            kind: TokenKind::Str(name),
            line,
            ..
        }] => Some(vec![(name.clone(), *line)]),
        _ => None,
    }
}

/// `new string[] { "A", "B" }` or `new[] { "A", "B" }`
fn string_array(args: &[Token]) -> Option<Vec<(String, usize)>> {
    let rest = match args {
        [new, ty, open, close, rest @ ..]
            if new.is_ident("new") && ty.is_ident("string") && open.is_punct('[') && close.is_punct(']') =>
        {
            rest
        }
        [new, open, close, rest @ ..] if new.is_ident("new") && open.is_punct('[') && close.is_punct(']') => rest,
        _ => return None,
    };
    let [open, items @ .., close] = rest else {
        return None;
    };
    if !open.is_punct('{') || !close.is_punct('}') {
        return None;
    }

    let mut names = Vec::new();
    let mut expect_item = true;
    for token in items {
        match &token.kind {
            TokenKind::Str(name) if expect_item => {
                names.push((name.clone(), token.line));
                expect_item = false;
            }
            TokenKind::Punct(',') if !expect_item => expect_item = true,
            _ => return None,
        }
    }
    Some(names)
}

/// Leading dotted identifier of a statement, e.g. `PublicIncludePaths`.
fn statement_key(tokens: &[Token]) -> String {
    let mut key = String::new();
    for token in tokens {
        match &token.kind {
            TokenKind::Ident(name) if key.is_empty() || key.ends_with('.') => key.push_str(name),
            TokenKind::Punct('.') if !key.is_empty() && !key.ends_with('.') => key.push('.'),
            _ => break,
        }
    }
    let key = key.trim_end_matches('.');
    if key.is_empty() {
        "statement".to_string()
    } else {
        key.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::manifest::condition::PredicateRef;

    const CITY_STREAMING: &str = r#"using UnrealBuildTool;

public class GSD_CityStreaming : ModuleRules
{
    public GSD_CityStreaming(ReadOnlyTargetRules Target) : base(Target)
    {
        PCHUsage = PCHUsageMode.UseExplicitOrSharedPCHs;

        PublicDependencyModuleNames.AddRange(new string[] {
            "Core",
            "CoreUObject",
            "Engine",
            "GSD_Core"
        });

        PrivateDependencyModuleNames.AddRange(new string[] {
        });

        // Enable automation tests for editor builds
        if (Target.bBuildEditor)
        {
            PrivateDependencyModuleNames.AddRange(new string[] {
                "UnrealEd",
                "AutomationController"
            });
        }
    }
}
"#;

    fn parse(src: &str, module: &str) -> ParseOutcome {
        parse_manifest(src, &Path::new("Plugins/P/Source").join(module))
    }

    fn module_with_body(name: &str, body: &str) -> String {
        format!(
            "public class {name} : ModuleRules\n{{\n    public {name}(ReadOnlyTargetRules Target) : base(Target)\n    {{\n        PCHUsage = PCHUsageMode.UseExplicitOrSharedPCHs;\n{body}\n    }}\n}}\n"
        )
    }

    #[test]
    fn parse_descriptor_with_editor_block() {
        let outcome = parse(CITY_STREAMING, "GSD_CityStreaming");
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let manifest = outcome.manifest.unwrap();

        assert_eq!(manifest.name, "GSD_CityStreaming");
        assert_eq!(manifest.pch_usage, PchUsage::UseExplicitOrSharedPCHs);
        assert_eq!(
            manifest.public.names().collect::<Vec<_>>(),
            vec!["Core", "CoreUObject", "Engine", "GSD_Core"]
        );
        assert!(manifest.private.is_empty());
        assert_eq!(manifest.conditionals.len(), 1);

        let block = &manifest.conditionals[0];
        assert_eq!(block.condition, Condition::when(Predicate::EditorBuild));
        assert_eq!(block.line, 20);
        assert_eq!(block.private.get("UnrealEd").map(|d| d.line), Some(23));
    }

    #[test]
    fn trailing_comments_inside_lists_are_ignored() {
        let src = module_with_body(
            "GSD_Crowds",
            r#"        PublicDependencyModuleNames.AddRange(new string[] {
            "MassAI",           // Moved from Private
            "ZoneGraph"         // lane navigation
        });
        PrivateDependencyModuleNames.AddRange(new string[] {
            // MassAI moved to Public
        });"#,
        );
        let manifest = parse(&src, "GSD_Crowds").manifest.unwrap();
        assert_eq!(manifest.public.len(), 2);
        assert!(manifest.private.is_empty());
    }

    #[test]
    fn single_add_and_trailing_comma() {
        let src = module_with_body(
            "Mod",
            r#"        PublicDependencyModuleNames.Add("Core");
        PrivateDependencyModuleNames.AddRange(new[] { "Slate", "SlateCore", });"#,
        );
        let manifest = parse(&src, "Mod").manifest.unwrap();
        assert!(manifest.public.contains("Core"));
        assert_eq!(manifest.private.len(), 2);
    }

    #[test]
    fn duplicate_entries_warn_and_are_ignored() {
        let src = module_with_body(
            "Mod",
            r#"        PublicDependencyModuleNames.AddRange(new string[] { "Core", "Engine", "Core" });"#,
        );
        let outcome = parse(&src, "Mod");
        let manifest = outcome.manifest.unwrap();
        assert_eq!(manifest.public.len(), 2);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::DuplicateEntry);
        assert_eq!(outcome.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn unknown_fields_are_preserved() {
        let src = module_with_body(
            "Mod",
            "        bEnforceIWYU = true;\n        PublicIncludePaths.Add(ModuleDirectory);",
        );
        let outcome = parse(&src, "Mod");
        let manifest = outcome.manifest.unwrap();
        assert_eq!(manifest.unknown.len(), 2);
        assert_eq!(manifest.unknown[0].key, "bEnforceIWYU");
        assert_eq!(manifest.unknown[0].raw, "bEnforceIWYU = true;");
        assert_eq!(manifest.unknown[1].key, "PublicIncludePaths.Add");
        assert!(
            outcome
                .diagnostics
                .iter()
                .all(|d| d.kind == DiagnosticKind::UnknownField)
        );
    }

    #[test]
    fn unknown_predicate_is_kept_verbatim() {
        let src = module_with_body(
            "Mod",
            r#"        if (Target.bBuildDeveloperTools)
        {
            PrivateDependencyModuleNames.Add("MessageLog");
        }"#,
        );
        let manifest = parse(&src, "Mod").manifest.unwrap();
        assert_eq!(
            manifest.conditionals[0].condition.predicate,
            PredicateRef::Unknown("Target.bBuildDeveloperTools".to_string())
        );
    }

    #[test]
    fn negated_and_else_conditions() {
        let src = module_with_body(
            "Mod",
            r#"        if (Target.bBuildEditor == false)
        {
            PrivateDependencyModuleNames.Add("GameOnly");
        }
        else
        {
            PrivateDependencyModuleNames.Add("UnrealEd");
        }
        if (!Target.bBuildEditor) PublicDependencyModuleNames.Add("Runtime");"#,
        );
        let manifest = parse(&src, "Mod").manifest.unwrap();
        let conditions: Vec<_> = manifest
            .conditionals
            .iter()
            .map(|b| b.condition.clone())
            .collect();
        assert_eq!(
            conditions,
            vec![
                Condition::unless(Predicate::EditorBuild),
                Condition::when(Predicate::EditorBuild),
                Condition::unless(Predicate::EditorBuild),
            ]
        );
        assert!(manifest.conditionals[2].public.contains("Runtime"));
    }

    #[test]
    fn reject_identifier_mismatch() {
        let outcome = parse(CITY_STREAMING, "Streaming");
        assert!(outcome.manifest.is_none());
        assert_eq!(outcome.diagnostics.len(), 1);
        let d = &outcome.diagnostics[0];
        assert_eq!(d.kind, DiagnosticKind::ParseError);
        assert_eq!(d.line, Some(3));
        assert!(d.message.contains("does not match its directory"));
    }

    #[test]
    fn reject_missing_pch() {
        let src = "public class Mod : ModuleRules { public Mod(ReadOnlyTargetRules Target) : base(Target) { } }";
        let outcome = parse(src, "Mod");
        assert!(outcome.manifest.is_none());
        assert!(outcome.diagnostics[0].message.contains("missing PCHUsage"));
    }

    #[test]
    fn reject_unknown_pch_mode() {
        let src = module_with_body("Mod", "").replace("UseExplicitOrSharedPCHs", "Sometimes");
        let outcome = parse(&src, "Mod");
        assert!(outcome.manifest.is_none());
        assert!(outcome.diagnostics[0].message.contains("unknown PCH usage mode 'Sometimes'"));
    }

    #[test]
    fn reject_nested_conditionals() {
        let src = module_with_body(
            "Mod",
            "        if (Target.bBuildEditor) { if (Target.bBuildEditor) { } }",
        );
        let outcome = parse(&src, "Mod");
        assert!(outcome.manifest.is_none());
        assert!(outcome.diagnostics[0].message.contains("nested"));
    }

    #[test]
    fn reject_truncated_file() {
        let outcome = parse("public class Mod : ModuleRules {", "Mod");
        assert!(outcome.manifest.is_none());
        assert!(outcome.diagnostics[0].message.contains("end of file"));
        assert_eq!(outcome.diagnostics[0].line, None);
    }

    #[test]
    fn reject_invalid_module_name() {
        let src = module_with_body("Mod", r#"        PublicDependencyModuleNames.Add("Not A Module");"#);
        let outcome = parse(&src, "Mod");
        assert!(outcome.manifest.is_none());
        assert!(outcome.diagnostics[0].message.contains("not a valid module name"));
    }

    #[test]
    fn diagnostics_point_at_descriptor_file() {
        let outcome = parse(CITY_STREAMING, "GSD_CityStreaming");
        assert_eq!(
            outcome.path,
            Path::new("Plugins/P/Source/GSD_CityStreaming/GSD_CityStreaming.Build.cs")
        );
    }

    #[test]
    fn redundant_parentheses_around_condition() {
        let src = module_with_body(
            "Mod",
            r#"        if ((Target.bBuildEditor))
        {
            PrivateDependencyModuleNames.Add("UnrealEd");
        }
        if (!(Target.bBuildEditor)) PrivateDependencyModuleNames.Add("GameOnly");
        if ((Target.bBuildEditor) && (Target.bBuildEditor)) PrivateDependencyModuleNames.Add("Both");"#,
        );
        let manifest = parse(&src, "Mod").manifest.unwrap();
        assert_eq!(
            manifest.conditionals[0].condition,
            Condition::when(Predicate::EditorBuild)
        );
        assert_eq!(
            manifest.conditionals[1].condition,
            Condition::unless(Predicate::EditorBuild)
        );
        assert_eq!(
            manifest.conditionals[2].condition.predicate,
            PredicateRef::Unknown("(Target.bBuildEditor) && (Target.bBuildEditor)".to_string())
        );
    }

    #[test]
    fn repeated_pch_assignment_keeps_the_last() {
        let src = module_with_body("Mod", "        PCHUsage = PCHUsageMode.NoPCHs;");
        let outcome = parse(&src, "Mod");
        assert_eq!(outcome.manifest.unwrap().pch_usage, PchUsage::NoPCHs);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::DuplicateEntry);
        assert!(
            outcome.diagnostics[0]
                .message
                .contains("'NoPCHs' replaces 'UseExplicitOrSharedPCHs'")
        );
    }

    #[test]
    fn invalid_utf8_fails_only_this_descriptor() {
        let mut bytes = module_with_body("Mod", "").into_bytes();
        bytes.extend_from_slice(b"// caf\xe9\n");
        let outcome = parse_manifest_bytes(&bytes, Path::new("Plugins/P/Source/Mod"));
        assert!(outcome.manifest.is_none());
        assert_eq!(outcome.diagnostics.len(), 1);
        let d = &outcome.diagnostics[0];
        assert_eq!(d.kind, DiagnosticKind::ParseError);
        assert_eq!(d.module.as_deref(), Some("Mod"));
        assert_eq!(d.line, Some(9));
        assert!(d.message.contains("not valid UTF-8"));

        let valid = parse_manifest_bytes(
            module_with_body("Mod", "").as_bytes(),
            Path::new("Plugins/P/Source/Mod"),
        );
        assert!(valid.manifest.is_some());
    }

    #[test]
    fn module_name_validation() {
        assert!(is_valid_module_name("GSD_Core"));
        assert!(is_valid_module_name("_Private2"));
        assert!(!is_valid_module_name(""));
        assert!(!is_valid_module_name("2Fast"));
        assert!(!is_valid_module_name("Has-Dash"));
    }
}
