//! JavaScript / TypeScript front end.
//!
//! Tolerant: local syntax errors are recovered by the grammar and the rest of
//! the file stays usable. A file is refused only when recovery kept nothing
//! but error nodes. Only top-level function and class declarations
//! (optionally exported) and the named methods of those classes are
//! definitions; nested, arrow and anonymous forms are not.

use tree_sitter::Node;

use crate::errors::ParseFailure;
use crate::indexer::parser::{
    first_error_line, parse_with, Language, LanguageFrontEnd, ParsedUnit, SyntaxNode,
};
use crate::indexer::source::SourceFile;
use crate::models::NodeKind;

const FUNCTION_DECLARATIONS: &[&str] = &["function_declaration", "generator_function_declaration"];

const CLASS_DECLARATIONS: &[&str] = &["class_declaration", "abstract_class_declaration"];

const METHOD_NAME_KINDS: &[&str] = &["property_identifier", "private_property_identifier", "identifier"];

#[derive(Clone, Copy, Debug, Default)]
pub struct JavaScriptFrontEnd;

/// True when error recovery kept at least one statement of the program.
fn has_recovered_statement(root: Node<'_>) -> bool {
    let mut cursor = root.walk();
    let recovered = root.named_children(&mut cursor).any(|child| !child.is_error());
    recovered
}

impl JavaScriptFrontEnd {
    pub(crate) fn grammars(&self) -> Vec<tree_sitter::Language> {
        vec![
            tree_sitter_javascript::LANGUAGE.into(),
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            tree_sitter_typescript::LANGUAGE_TSX.into(),
        ]
    }

    fn grammar_for(&self, source: &SourceFile) -> tree_sitter::Language {
        let ext = source
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "ts" => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            "tsx" => tree_sitter_typescript::LANGUAGE_TSX.into(),
            _ => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

fn is_class(node: Node<'_>) -> bool {
    CLASS_DECLARATIONS.contains(&node.kind())
}

fn declared_name(unit: &ParsedUnit, node: Node<'_>) -> Option<String> {
    node.child_by_field_name("name")
        .map(|n| unit.node_text(n).to_string())
}

fn method_name(unit: &ParsedUnit, method: Node<'_>) -> Option<String> {
    let name = method.child_by_field_name("name")?;
    if METHOD_NAME_KINDS.contains(&name.kind()) {
        Some(unit.node_text(name).to_string())
    } else {
        None
    }
}

/// Unwraps `export` so exported declarations count as top-level ones.
fn top_level_declaration(node: Node<'_>) -> Option<Node<'_>> {
    let declaration = if node.kind() == "export_statement" {
        node.child_by_field_name("declaration")?
    } else {
        node
    };
    let kind = declaration.kind();
    if FUNCTION_DECLARATIONS.contains(&kind) || CLASS_DECLARATIONS.contains(&kind) {
        Some(declaration)
    } else {
        None
    }
}

/// `Base` or `ns.sub.Base`; calls, mixins and other expressions are dropped.
fn dotted_name(unit: &ParsedUnit, node: Node<'_>) -> Option<String> {
    match node.kind() {
        "identifier" | "type_identifier" => Some(unit.node_text(node).to_string()),
        "member_expression" => {
            let object = dotted_name(unit, node.child_by_field_name("object")?)?;
            let property = node.child_by_field_name("property")?;
            Some(format!("{object}.{}", unit.node_text(property)))
        }
        _ => None,
    }
}

impl LanguageFrontEnd for JavaScriptFrontEnd {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn parse(&self, source: SourceFile) -> Result<ParsedUnit, ParseFailure> {
        let tree = parse_with(self.grammar_for(&source), &source.text)?;
        let root = tree.root_node();
        if root.is_error() || (root.has_error() && !has_recovered_statement(root)) {
            let line = first_error_line(root).unwrap_or(root.start_position().row + 1);
            return Err(ParseFailure::Syntax { line });
        }
        Ok(ParsedUnit { source, tree })
    }

    fn definitions<'t>(&self, unit: &'t ParsedUnit) -> Vec<SyntaxNode<'t>> {
        let root = unit.tree.root_node();
        let mut cursor = root.walk();
        let declarations: Vec<Node<'t>> = root
            .named_children(&mut cursor)
            .filter_map(top_level_declaration)
            .collect();

        let mut found = Vec::new();
        for declaration in declarations {
            if !is_class(declaration) {
                found.push(SyntaxNode::new(
                    NodeKind::FunctionDef,
                    declared_name(unit, declaration),
                    declaration,
                ));
                continue;
            }
            found.push(SyntaxNode::new(
                NodeKind::ClassDef,
                declared_name(unit, declaration),
                declaration,
            ));
            let Some(body) = declaration.child_by_field_name("body") else {
                continue;
            };
            let mut body_cursor = body.walk();
            for member in body.named_children(&mut body_cursor) {
                if member.kind() == "method_definition" {
                    found.push(SyntaxNode::new(
                        NodeKind::FunctionDef,
                        method_name(unit, member),
                        member,
                    ));
                }
            }
        }
        found
    }

    fn base_references(&self, unit: &ParsedUnit, class: &SyntaxNode<'_>) -> Vec<String> {
        if class.kind != NodeKind::ClassDef {
            return Vec::new();
        }
        let node = class.raw();
        let mut cursor = node.walk();
        let Some(heritage) = node
            .named_children(&mut cursor)
            .find(|child| child.kind() == "class_heritage")
        else {
            return Vec::new();
        };

        let mut bases = Vec::new();
        let mut heritage_cursor = heritage.walk();
        let clauses: Vec<Node<'_>> = heritage.named_children(&mut heritage_cursor).collect();
        for clause in clauses {
            match clause.kind() {
                // TypeScript wraps the superclass in an extends clause.
                "extends_clause" => {
                    let mut clause_cursor = clause.walk();
                    bases.extend(
                        clause
                            .children_by_field_name("value", &mut clause_cursor)
                            .filter_map(|value| dotted_name(unit, value)),
                    );
                }
                "implements_clause" | "comment" => {}
                _ => bases.extend(dotted_name(unit, clause)),
            }
        }
        bases
    }

    fn enclosing_class<'t>(
        &self,
        unit: &'t ParsedUnit,
        node: &SyntaxNode<'t>,
    ) -> Option<SyntaxNode<'t>> {
        let mut current = node.raw().parent();
        while let Some(parent) = current {
            if is_class(parent) || parent.kind() == "class" {
                return Some(SyntaxNode::new(
                    NodeKind::ClassDef,
                    declared_name(unit, parent),
                    parent,
                ));
            }
            current = parent.parent();
        }
        None
    }
}
