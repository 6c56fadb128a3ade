//! Declarative projection of XML documents into named value sequences.
//!
//! An [`Instruction`] maps field names to selectors. Projecting a document
//! yields, per field, the text of every matched node in document order (or a
//! scalar for `count(...)`/`boolean(...)` selectors). A selector that matches
//! nothing yields an empty sequence: the field is absent, not an error. Only a
//! document without the expected item container is rejected.

use std::collections::HashMap;

use roxmltree::{Document, Node};
use tracing::warn;

use crate::constants::MULTISTATUS;
use crate::error::{CalDavError, CalDavResult};
use crate::xml::selector::{Selection, Selector, node_text};

/// Field name → selector mapping.
#[derive(Debug, Clone)]
pub struct Instruction {
    container: String,
    fields: Vec<(String, Selector)>,
}

impl Instruction {
    /// New instruction expecting a `multistatus` root element.
    pub fn new() -> Self {
        Instruction {
            container: MULTISTATUS.to_string(),
            fields: Vec::new(),
        }
    }

    /// Add a field. Fails on selector syntax the evaluator does not support.
    pub fn field(mut self, name: impl Into<String>, selector: &str) -> CalDavResult<Self> {
        let selector = Selector::parse(selector).map_err(CalDavError::InvalidSelector)?;
        self.fields.push((name.into(), selector));
        Ok(self)
    }
}

impl Default for Instruction {
    fn default() -> Self {
        Instruction::new()
    }
}

/// One projected field.
#[derive(Debug, Clone, PartialEq)]
pub enum Projected {
    Values(Vec<String>),
    Number(f64),
    Boolean(bool),
}

/// Projection result, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    fields: HashMap<String, Projected>,
}

impl Projection {
    pub fn get(&self, name: &str) -> Option<&Projected> {
        self.fields.get(name)
    }

    /// Values of a node-set field; empty when the field matched nothing.
    pub fn values(&self, name: &str) -> &[String] {
        match self.fields.get(name) {
            Some(Projected::Values(values)) => values,
            _ => &[],
        }
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.fields.get(name) {
            Some(Projected::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.fields.get(name) {
            Some(Projected::Boolean(b)) => Some(*b),
            _ => None,
        }
    }
}

/// Parse response text into a navigable document.
pub fn parse_document(text: &str) -> CalDavResult<Document<'_>> {
    Document::parse(text)
        .map_err(|e| CalDavError::MalformedResponse(format!("malformed document: {e}")))
}

/// Project a whole document.
pub fn project(doc: &Document, instruction: &Instruction) -> CalDavResult<Projection> {
    check_container(doc, instruction)?;
    Ok(evaluate(doc.root(), instruction))
}

/// Project each item selected by `items`, evaluating the instruction relative
/// to the item node. Keeps fields of one item aligned with each other.
pub fn project_items(
    doc: &Document,
    items: &str,
    instruction: &Instruction,
) -> CalDavResult<Vec<Projection>> {
    check_container(doc, instruction)?;
    let items = Selector::parse(items).map_err(CalDavError::InvalidSelector)?;

    match items.select(doc.root()) {
        Selection::Nodes(nodes) => Ok(nodes.into_iter().map(|node| evaluate(node, instruction)).collect()),
        _ => Err(CalDavError::InvalidSelector(format!("'{items}' does not select nodes"))),
    }
}

fn check_container(doc: &Document, instruction: &Instruction) -> CalDavResult<()> {
    let expected = &instruction.container;
    let root = doc.root_element();
    if root.tag_name().name() != expected {
        return Err(CalDavError::MalformedResponse(format!(
            "malformed document: expected <{}> root element, found <{}>",
            expected,
            root.tag_name().name()
        )));
    }
    Ok(())
}

fn evaluate(context: Node, instruction: &Instruction) -> Projection {
    let fields = instruction
        .fields
        .iter()
        .map(|(name, selector)| {
            let projected = match selector.select(context) {
                Selection::Nodes(nodes) => {
                    if nodes.is_empty() {
                        warn!(field = %name, %selector, "selector matched no nodes");
                    }
                    Projected::Values(nodes.iter().map(node_text).collect())
                }
                Selection::Number(n) => Projected::Number(n),
                Selection::Boolean(b) => Projected::Boolean(b),
            };
            (name.clone(), projected)
        })
        .collect();

    Projection { fields }
}
