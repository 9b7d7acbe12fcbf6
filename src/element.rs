use std::collections::BTreeMap;

use quick_xml::escape::{EscapeError, resolve_predefined_entity};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{GpxError, Result};

/// In-scope namespace declarations, prefix to URI. The default namespace is
/// stored under the empty prefix.
pub type Namespaces = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    name: String,
    namespace: Option<String>,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
    namespaces: Namespaces,
}

impl Element {
    /// Create an element in the default namespace of `namespaces`.
    pub fn new(name: impl Into<String>, namespaces: Namespaces) -> Self {
        Self {
            name: name.into(),
            namespace: namespaces.get("").cloned(),
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            namespaces,
        }
    }

    /// Local name, without prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Text content, `None` when the element has none.
    pub fn text(&self) -> Option<&str> {
        if self.text.is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First child with the given local name in this element's namespace.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children
            .iter()
            .find(|child| child.name == name && child.namespace == self.namespace)
    }

    /// All children with the given local name in this element's namespace,
    /// in document order.
    pub fn find_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Element> {
        self.children
            .iter()
            .filter(move |child| child.name == name && child.namespace == self.namespace)
    }

    /// Append a new child sharing this element's namespace and namespace map.
    pub fn append_child(&mut self, name: impl Into<String>) -> &mut Element {
        let child = Element {
            name: name.into(),
            namespace: self.namespace.clone(),
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            namespaces: self.namespaces.clone(),
        };
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Append a text-only child.
    pub fn append_text_child(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.append_child(name).set_text(text);
    }

    /// Parse an XML string into its root element.
    pub fn parse_str(xml: &str) -> Result<Element> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let element = open_element(&e, stack.last().map(|p| &p.namespaces))?;
                    stack.push(element);
                }
                Ok(Event::Empty(e)) => {
                    let element = open_element(&e, stack.last().map(|p| &p.namespaces))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Ok(Event::End(_)) => {
                    let Some(mut element) = stack.pop() else {
                        continue;
                    };
                    if !element.children.is_empty() && element.text.trim().is_empty() {
                        element.text.clear();
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    if let Some(current) = stack.last_mut() {
                        match e.resolve_char_ref()? {
                            Some(ch) => current.text.push(ch),
                            None => {
                                let name = String::from_utf8_lossy(e.as_ref()).into_owned();
                                let Some(text) = resolve_predefined_entity(&name) else {
                                    let end = reader.buffer_position() as usize;
                                    let start = end.saturating_sub(name.len() + 2);
                                    return Err(EscapeError::UnrecognizedEntity(start..end, name).into());
                                };
                                current.text.push_str(text);
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(GpxError::Xml(e)),
                _ => {}
            }
        }

        Err(GpxError::EmptyDocument)
    }

    /// Serialize the tree with an XML declaration and two-space indentation.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write(&mut writer, None)?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>, parent: Option<&Namespaces>) -> Result<()> {
        let qname = self.qualified_name();
        let mut start = BytesStart::new(qname.as_str());

        for (prefix, uri) in &self.namespaces {
            if parent.is_some_and(|scope| scope.get(prefix) == Some(uri)) {
                continue;
            }
            let key = if prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{prefix}")
            };
            start.push_attribute((key.as_str(), uri.as_str()));
        }
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if self.children.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write(writer, Some(&self.namespaces))?;
        }
        writer.write_event(Event::End(BytesEnd::new(qname.as_str())))?;
        Ok(())
    }

    fn qualified_name(&self) -> String {
        let Some(uri) = &self.namespace else {
            return self.name.clone();
        };
        match self
            .namespaces
            .iter()
            .find(|(_, bound)| *bound == uri)
            .map(|(prefix, _)| prefix.as_str())
        {
            Some(prefix) if !prefix.is_empty() && self.namespaces.get("") != Some(uri) => {
                format!("{prefix}:{}", self.name)
            }
            _ => self.name.clone(),
        }
    }
}

/// Build an element from a start tag, resolving its namespace against the
/// parent scope plus its own `xmlns` declarations.
fn open_element(start: &BytesStart<'_>, scope: Option<&Namespaces>) -> Result<Element> {
    let mut namespaces = scope.cloned().unwrap_or_default();
    let mut attributes = Vec::new();

    for attr_result in start.attributes() {
        let attr = attr_result.map_err(|e| GpxError::Xml(e.into()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = quick_xml::escape::unescape(&raw)?.into_owned();

        if key == "xmlns" {
            namespaces.insert(String::new(), value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespaces.insert(prefix.to_string(), value);
        } else {
            attributes.push((key, value));
        }
    }

    let qname = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let (prefix, name) = match qname.split_once(':') {
        Some((prefix, local)) => (prefix, local.to_string()),
        None => ("", qname.clone()),
    };
    let namespace = namespaces.get(prefix).cloned();

    Ok(Element {
        name,
        namespace,
        attributes,
        text: String::new(),
        children: Vec::new(),
        namespaces,
    })
}
