//! XPath-style node selection over a roxmltree document.
//!
//! Supports the subset needed to read WebDAV multistatus replies:
//!
//! - absolute (`/`, `//`) and relative (`./`, `.//`) location paths
//! - name tests by local name: `*[local-name()='href']`, `href`, `d:href`
//!   (the prefix is ignored), and `*`
//! - `text()` as the final step
//! - `count(path)` and `boolean(path)`
//!
//! Element matching is by local name only, so servers that pick different
//! namespace prefixes are read the same way.

use std::fmt;

use roxmltree::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    LocalName(String),
    AnyElement,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Nodes,
    Count,
    Boolean,
}

/// A parsed selector expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    function: Function,
    relative: bool,
    steps: Vec<Step>,
}

/// Result of evaluating a [`Selector`].
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<'a, 'input> {
    Nodes(Vec<Node<'a, 'input>>),
    Number(f64),
    Boolean(bool),
}

impl Selector {
    /// Parse a selector expression.
    ///
    /// The error is a human-readable reason.
    pub fn parse(expr: &str) -> Result<Self, String> {
        let trimmed = expr.trim();
        let (function, path) = if let Some(inner) = strip_call(trimmed, "count") {
            (Function::Count, inner)
        } else if let Some(inner) = strip_call(trimmed, "boolean") {
            (Function::Boolean, inner)
        } else {
            (Function::Nodes, trimmed)
        };

        let (relative, mut rest) = match path.strip_prefix('.') {
            Some(rest) => (true, rest),
            None => (false, path),
        };
        if !rest.starts_with('/') {
            return Err(format!("'{expr}' must start with '/', '//', './' or './/'"));
        }

        let mut steps = Vec::new();
        while !rest.is_empty() {
            let axis = if let Some(r) = rest.strip_prefix("//") {
                rest = r;
                Axis::Descendant
            } else if let Some(r) = rest.strip_prefix('/') {
                rest = r;
                Axis::Child
            } else {
                return Err(format!("expected '/' in '{expr}' before '{rest}'"));
            };

            let (raw_step, remainder) = split_step(rest);
            rest = remainder;
            let test = parse_node_test(raw_step).ok_or_else(|| format!("unsupported step '{raw_step}' in '{expr}'"))?;

            if steps.last().is_some_and(|s: &Step| s.test == NodeTest::Text) {
                return Err(format!("text() must be the last step in '{expr}'"));
            }
            steps.push(Step { axis, test });
        }

        if steps.is_empty() {
            return Err(format!("'{expr}' has no steps"));
        }

        Ok(Selector {
            source: expr.to_string(),
            function,
            relative,
            steps,
        })
    }

    /// Evaluate against `context`. Absolute paths start from the document root.
    pub fn select<'a, 'input>(&self, context: Node<'a, 'input>) -> Selection<'a, 'input> {
        let start = if self.relative {
            context
        } else {
            context.document().root()
        };

        let mut current = vec![start];
        for step in &self.steps {
            let mut next: Vec<Node<'a, 'input>> = Vec::new();
            for node in &current {
                match step.axis {
                    Axis::Child => next.extend(node.children().filter(|n| step.matches(n))),
                    Axis::Descendant => next.extend(node.descendants().skip(1).filter(|n| step.matches(n))),
                }
            }
            // Keep document order without duplicates from overlapping descendant walks
            next.sort_by_key(|n| n.id().get_usize());
            next.dedup_by_key(|n| n.id().get_usize());
            current = next;
        }

        match self.function {
            Function::Nodes => Selection::Nodes(current),
            Function::Count => Selection::Number(current.len() as f64),
            Function::Boolean => Selection::Boolean(!current.is_empty()),
        }
    }
}

impl Step {
    fn matches(&self, node: &Node) -> bool {
        match &self.test {
            NodeTest::LocalName(name) => node.is_element() && node.tag_name().name() == name,
            NodeTest::AnyElement => node.is_element(),
            NodeTest::Text => node.is_text(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Textual content of a node: the text itself, or all descendant text of an element.
pub fn node_text(node: &Node) -> String {
    if node.is_text() {
        return node.text().unwrap_or_default().to_string();
    }
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn strip_call<'a>(expr: &'a str, name: &str) -> Option<&'a str> {
    expr.strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
        .map(str::trim)
}

/// Split off the next step, ignoring '/' inside predicates.
fn split_step(input: &str) -> (&str, &str) {
    let mut depth = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => return (&input[..i], &input[i..]),
            _ => {}
        }
    }
    (input, "")
}

fn parse_node_test(step: &str) -> Option<NodeTest> {
    let step = step.trim();
    if step == "text()" {
        return Some(NodeTest::Text);
    }
    if step == "*" {
        return Some(NodeTest::AnyElement);
    }
    if let Some(predicate) = step.strip_prefix("*[").and_then(|s| s.strip_suffix(']')) {
        let literal = predicate
            .trim()
            .strip_prefix("local-name()")?
            .trim_start()
            .strip_prefix('=')?
            .trim();
        let name = literal
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .or_else(|| literal.strip_prefix('"').and_then(|s| s.strip_suffix('"')))?;
        return is_name(name).then(|| NodeTest::LocalName(name.to_string()));
    }

    let local = step.rsplit(':').next().unwrap_or(step);
    is_name(local).then(|| NodeTest::LocalName(local.to_string()))
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
