//! Python front end.
//!
//! Strict: a file whose tree contains any syntax error is refused as a
//! whole, the way the interpreter's own parser would refuse it. Every
//! `class`, `def` and `async def` is a definition, at any depth.

use tree_sitter::Node;

use crate::errors::ParseFailure;
use crate::indexer::parser::{
    first_error_line, parse_with, Language, LanguageFrontEnd, ParsedUnit, SyntaxNode,
};
use crate::indexer::source::SourceFile;
use crate::models::NodeKind;

#[derive(Clone, Copy, Debug, Default)]
pub struct PythonFrontEnd;

impl PythonFrontEnd {
    pub(crate) fn grammars(&self) -> Vec<tree_sitter::Language> {
        vec![tree_sitter_python::LANGUAGE.into()]
    }
}

fn definition_kind(node: Node<'_>) -> Option<NodeKind> {
    match node.kind() {
        "class_definition" => Some(NodeKind::ClassDef),
        "function_definition" => Some(NodeKind::FunctionDef),
        _ => None,
    }
}

fn to_syntax_node<'t>(unit: &'t ParsedUnit, node: Node<'t>) -> Option<SyntaxNode<'t>> {
    let kind = definition_kind(node)?;
    let name = node
        .child_by_field_name("name")
        .map(|n| unit.node_text(n).to_string());
    Some(SyntaxNode::new(kind, name, node))
}

/// Dotted form of a `Name` or `a.b.C` attribute chain; anything else is
/// unnameable.
fn dotted_name(unit: &ParsedUnit, node: Node<'_>) -> Option<String> {
    match node.kind() {
        "identifier" => Some(unit.node_text(node).to_string()),
        "attribute" => {
            let object = dotted_name(unit, node.child_by_field_name("object")?)?;
            let attribute = node.child_by_field_name("attribute")?;
            Some(format!("{object}.{}", unit.node_text(attribute)))
        }
        _ => None,
    }
}

impl LanguageFrontEnd for PythonFrontEnd {
    fn language(&self) -> Language {
        Language::Python
    }

    fn parse(&self, source: SourceFile) -> Result<ParsedUnit, ParseFailure> {
        let tree = parse_with(tree_sitter_python::LANGUAGE.into(), &source.text)?;
        if let Some(line) = first_error_line(tree.root_node()) {
            return Err(ParseFailure::Syntax { line });
        }
        Ok(ParsedUnit { source, tree })
    }

    fn definitions<'t>(&self, unit: &'t ParsedUnit) -> Vec<SyntaxNode<'t>> {
        let mut found = Vec::new();
        let mut stack = vec![unit.tree.root_node()];
        while let Some(node) = stack.pop() {
            if let Some(def) = to_syntax_node(unit, node) {
                found.push(def);
            }
            let mut cursor = node.walk();
            let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        found
    }

    fn base_references(&self, unit: &ParsedUnit, class: &SyntaxNode<'_>) -> Vec<String> {
        if class.kind != NodeKind::ClassDef {
            return Vec::new();
        }
        let Some(arguments) = class.raw().child_by_field_name("superclasses") else {
            return Vec::new();
        };
        let mut bases = Vec::new();
        let mut metaclass = None;
        let mut cursor = arguments.walk();
        for argument in arguments.named_children(&mut cursor) {
            if argument.kind() == "keyword_argument" {
                let is_metaclass = argument
                    .child_by_field_name("name")
                    .is_some_and(|n| unit.node_text(n) == "metaclass");
                if is_metaclass {
                    metaclass = argument
                        .child_by_field_name("value")
                        .and_then(|value| dotted_name(unit, value));
                }
            } else if let Some(base) = dotted_name(unit, argument) {
                bases.push(base);
            }
        }
        bases.extend(metaclass);
        bases
    }

    fn enclosing_class<'t>(
        &self,
        unit: &'t ParsedUnit,
        node: &SyntaxNode<'t>,
    ) -> Option<SyntaxNode<'t>> {
        let mut current = node.raw().parent();
        while let Some(parent) = current {
            if parent.kind() == "class_definition" {
                return to_syntax_node(unit, parent);
            }
            current = parent.parent();
        }
        None
    }

    fn enclosing_scopes(&self, unit: &ParsedUnit, node: &SyntaxNode<'_>) -> Vec<String> {
        let mut scopes = Vec::new();
        let mut current = node.raw().parent();
        while let Some(parent) = current {
            if definition_kind(parent).is_some() {
                if let Some(name) = parent.child_by_field_name("name") {
                    scopes.push(unit.node_text(name).to_string());
                }
            }
            current = parent.parent();
        }
        scopes.reverse();
        scopes
    }
}
