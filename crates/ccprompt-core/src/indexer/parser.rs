//! Language front ends over native tree-sitter grammars.
//!
//! Each supported language implements [`LanguageFrontEnd`]; the closed set of
//! variants is selected by [`Language`] tag through [`FrontEnd`].

use std::fmt;
use std::ops::Deref;
use std::path::Path;
use std::str::FromStr;

use tree_sitter::{Node, Tree};

use crate::errors::{CcpromptError, CcpromptResult, ParseFailure};
use crate::indexer::javascript::JavaScriptFrontEnd;
use crate::indexer::python::PythonFrontEnd;
use crate::indexer::source::SourceFile;
use crate::models::{NodeKind, SourceSpan};

// ---------------------------------------------------------------------------
// Language tags
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    /// Resolve a caller-supplied tag. Unknown tags are a configuration error.
    pub fn from_tag(tag: &str) -> CcpromptResult<Self> {
        match tag.trim().to_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" => Ok(Language::JavaScript),
            _ => Err(CcpromptError::UnsupportedLanguage(tag.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = CcpromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_tag(s)
    }
}

// ---------------------------------------------------------------------------
// Parsed units and nodes
// ---------------------------------------------------------------------------

/// A source file together with its syntax tree.
pub struct ParsedUnit {
    pub source: SourceFile,
    pub tree: Tree,
}

impl ParsedUnit {
    pub fn path(&self) -> &Path {
        &self.source.path
    }

    pub fn text(&self) -> &str {
        &self.source.text
    }

    pub(crate) fn node_text(&self, node: Node<'_>) -> &str {
        &self.source.text[node.start_byte()..node.end_byte()]
    }
}

/// Handle to a definition inside a [`ParsedUnit`]'s tree.
#[derive(Clone, Debug)]
pub struct SyntaxNode<'t> {
    pub kind: NodeKind,
    /// Absent for anonymous or computed names.
    pub name: Option<String>,
    node: Node<'t>,
}

impl<'t> SyntaxNode<'t> {
    pub(crate) fn new(kind: NodeKind, name: Option<String>, node: Node<'t>) -> Self {
        Self { kind, name, node }
    }

    pub fn raw(&self) -> Node<'t> {
        self.node
    }

    pub fn span(&self) -> SourceSpan {
        SourceSpan {
            start_byte: self.node.start_byte(),
            end_byte: self.node.end_byte(),
            start_line: self.node.start_position().row + 1,
            end_line: self.node.end_position().row + 1,
        }
    }

    pub fn source_text<'s>(&self, unit: &'s ParsedUnit) -> &'s str {
        unit.node_text(self.node)
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }
}

/// 1-based line of the first error or missing node under `node`.
pub(crate) fn first_error_line(node: Node<'_>) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error_line)
}

pub(crate) fn parse_with(
    grammar: tree_sitter::Language,
    text: &str,
) -> Result<Tree, ParseFailure> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| ParseFailure::Grammar(e.to_string()))?;
    parser.parse(text.as_bytes(), None).ok_or(ParseFailure::NoTree)
}

// ---------------------------------------------------------------------------
// Capability interface
// ---------------------------------------------------------------------------

/// Uniform queries every language front end answers.
pub trait LanguageFrontEnd {
    fn language(&self) -> Language;

    /// Build a tree for `source`. A refused file contributes nothing.
    fn parse(&self, source: SourceFile) -> Result<ParsedUnit, ParseFailure>;

    /// Every class and function definition this front end recognizes, in
    /// document order.
    fn definitions<'t>(&self, unit: &'t ParsedUnit) -> Vec<SyntaxNode<'t>>;

    /// Direct bases in declaration order, then the metaclass if declared.
    /// Reference shapes that cannot be named are dropped.
    fn base_references(&self, unit: &ParsedUnit, class: &SyntaxNode<'_>) -> Vec<String>;

    /// The innermost class lexically enclosing `node`, if any.
    fn enclosing_class<'t>(&self, unit: &'t ParsedUnit, node: &SyntaxNode<'t>)
        -> Option<SyntaxNode<'t>>;

    fn definitions_named<'t>(&self, unit: &'t ParsedUnit, name: &str) -> Vec<SyntaxNode<'t>> {
        self.definitions(unit)
            .into_iter()
            .filter(|def| def.is_named(name))
            .collect()
    }

    /// First class named `name` in document order.
    fn class_named<'t>(&self, unit: &'t ParsedUnit, name: &str) -> Option<SyntaxNode<'t>> {
        self.definitions(unit)
            .into_iter()
            .find(|def| def.kind == NodeKind::ClassDef && def.is_named(name))
    }

    /// Names of the classes enclosing `node`, outermost first, innermost last.
    fn enclosing_chain(&self, unit: &ParsedUnit, node: &SyntaxNode<'_>) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = self.enclosing_class(unit, node);
        while let Some(class) = current {
            if let Some(name) = class.name.clone() {
                chain.push(name);
            }
            current = self.enclosing_class(unit, &class);
        }
        chain.reverse();
        chain
    }

    /// Names of every definition scope around `node`, outermost first.
    ///
    /// Languages whose functions can nest definitions include the function
    /// names here as well as the classes.
    fn enclosing_scopes(&self, unit: &ParsedUnit, node: &SyntaxNode<'_>) -> Vec<String> {
        self.enclosing_chain(unit, node)
    }

    /// Dotted path of `node` within its file (`Outer.Inner.method`).
    fn qualified_member(&self, unit: &ParsedUnit, node: &SyntaxNode<'_>) -> Option<String> {
        let name = node.name.as_deref()?;
        let mut parts = self.enclosing_scopes(unit, node);
        parts.push(name.to_string());
        Some(parts.join("."))
    }
}

// ---------------------------------------------------------------------------
// Closed set of front ends
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub enum FrontEnd {
    Python(PythonFrontEnd),
    JavaScript(JavaScriptFrontEnd),
}

impl FrontEnd {
    /// Construct the front end for `language`, checking that its grammars
    /// load before any file is touched.
    pub fn for_language(language: Language) -> CcpromptResult<Self> {
        let front_end = match language {
            Language::Python => FrontEnd::Python(PythonFrontEnd),
            Language::JavaScript => FrontEnd::JavaScript(JavaScriptFrontEnd),
        };
        front_end.check_grammars()?;
        Ok(front_end)
    }

    pub fn from_tag(tag: &str) -> CcpromptResult<Self> {
        Self::for_language(Language::from_tag(tag)?)
    }

    fn check_grammars(&self) -> CcpromptResult<()> {
        let grammars = match self {
            FrontEnd::Python(fe) => fe.grammars(),
            FrontEnd::JavaScript(fe) => fe.grammars(),
        };
        for grammar in grammars {
            tree_sitter::Parser::new()
                .set_language(&grammar)
                .map_err(|e| CcpromptError::Grammar(e.to_string()))?;
        }
        Ok(())
    }
}

impl Deref for FrontEnd {
    type Target = dyn LanguageFrontEnd;

    fn deref(&self) -> &Self::Target {
        match self {
            FrontEnd::Python(fe) => fe,
            FrontEnd::JavaScript(fe) => fe,
        }
    }
}

impl fmt::Debug for FrontEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrontEnd({})", self.language())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_tag() {
        assert_eq!(Language::from_tag("python").unwrap(), Language::Python);
        assert_eq!(Language::from_tag(" JavaScript ").unwrap(), Language::JavaScript);
        assert_eq!("js".parse::<Language>().unwrap(), Language::JavaScript);
        assert!(matches!(
            Language::from_tag("cobol"),
            Err(CcpromptError::UnsupportedLanguage(tag)) if tag == "cobol"
        ));
    }

    #[test]
    fn test_front_end_dispatch_by_tag() {
        assert_eq!(FrontEnd::from_tag("py").unwrap().language(), Language::Python);
        assert_eq!(FrontEnd::from_tag("js").unwrap().language(), Language::JavaScript);
        assert!(FrontEnd::from_tag("ruby").is_err());
    }
}
