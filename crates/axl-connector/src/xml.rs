//! Minimal element tree for bounded AXL payload fragments.
//!
//! Only used after the envelope has been cut down to a `<return>` or
//! `<soapenv:Fault>` section. Namespace prefixes are dropped.

use quick_xml::events::Event;
use quick_xml::Reader;

/// One parsed element with its concatenated text content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// First direct child with this local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text of the first direct child with this local name, empty if absent.
    pub fn child_text(&self, name: &str) -> &str {
        self.child(name).map_or("", |c| c.text.as_str())
    }

    /// Follow a chain of child names.
    pub fn path(&self, names: &[&str]) -> Option<&Element> {
        names.iter().try_fold(self, |node, name| node.child(name))
    }
}

/// Parse a fragment into its root element.
pub(crate) fn parse(xml: &str) -> Result<Element, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push(Element::named(name));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                attach(&mut stack, &mut root, Element::named(name));
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| format!("invalid text: {e}"))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(_)) => {
                let done = stack
                    .pop()
                    .ok_or_else(|| "unbalanced end tag".to_string())?;
                attach(&mut stack, &mut root, done);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML parse error at position {}: {e}",
                    reader.error_position()
                ))
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name));
    }
    root.ok_or_else(|| "no root element".to_string())
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let root = parse(
            "<return><componentVersion><version>14.0.1</version></componentVersion></return>",
        )
        .unwrap();
        assert_eq!(root.name, "return");
        assert_eq!(
            root.path(&["componentVersion", "version"]).unwrap().text,
            "14.0.1"
        );
    }

    #[test]
    fn test_prefixes_dropped_and_entities_unescaped() {
        let root = parse("<soapenv:Fault><faultstring>a &amp; b</faultstring></soapenv:Fault>")
            .unwrap();
        assert_eq!(root.name, "Fault");
        assert_eq!(root.child_text("faultstring"), "a & b");
        assert_eq!(root.child_text("missing"), "");
    }

    #[test]
    fn test_empty_elements() {
        let root = parse("<row><a/><b>x</b></row>").unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.child_text("a"), "");
    }

    #[test]
    fn test_errors() {
        assert!(parse("").is_err());
        assert!(parse("<a><b></a>").is_err());
        assert!(parse("<a><b>").is_err());
    }
}
