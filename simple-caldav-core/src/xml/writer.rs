//! Minimal XML element builder for request bodies.
//!
//! Text and attribute values are always escaped, so caller data (sync tokens,
//! hrefs, timestamps) can never change the shape of a request.

#[derive(Debug, Clone, PartialEq)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    /// `name` is a qualified name such as `d:prop`.
    pub fn new(name: impl Into<String>) -> Self {
        XmlElement {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = XmlElement>) -> Self {
        self.children
            .extend(children.into_iter().map(XmlNode::Element));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Render as a standalone document with an XML declaration.
    pub fn to_document(&self) -> String {
        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        out.push('\n');
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_into(value, out);
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(element) => element.write_to(out),
                XmlNode::Text(text) => escape_into(text, out),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn escape_into(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_nested_elements() {
        let xml = XmlElement::new("d:prop")
            .attr("xmlns:d", "DAV:")
            .child(XmlElement::new("d:getetag"))
            .to_document();

        assert!(xml.ends_with(r#"<d:prop xmlns:d="DAV:"><d:getetag/></d:prop>"#), "XML: {}", xml);
    }

    #[test]
    fn test_escapes_text_and_attributes() {
        let xml = XmlElement::new("d:sync-token")
            .attr("xmlns:d", "DAV:")
            .attr("note", "a\"b")
            .text("http://x/?a=1&b=<2>")
            .to_document();

        assert!(xml.contains(r#"note="a&quot;b""#), "XML: {}", xml);
        assert!(xml.contains("http://x/?a=1&amp;b=&lt;2&gt;"), "XML: {}", xml);
        assert!(roxmltree::Document::parse(&xml).is_ok());
    }
}
