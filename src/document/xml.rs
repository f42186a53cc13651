use quick_xml::{
    Reader, Writer,
    events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{
    error::{DocumentError, EvalError},
    path::PathSegment,
};

/// Owned XML element: name, attributes in document order, child nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        XmlElement {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    /// First direct child element called `name`.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|node| match node {
            XmlNode::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    fn child_or_insert(&mut self, name: &str) -> &mut XmlElement {
        let index = self
            .children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(e) if e.name == name));
        let index = match index {
            Some(i) => i,
            None => {
                self.children.push(XmlNode::Element(XmlElement::new(name)));
                self.children.len() - 1
            }
        };
        match &mut self.children[index] {
            XmlNode::Element(e) => e,
            _ => unreachable!("index points at an element"),
        }
    }

    /// Direct text and CDATA children, concatenated in document order.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(t) | XmlNode::CData(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Replaces all children with a single text node.
    pub fn set_text(&mut self, text: &str) {
        self.children = vec![XmlNode::Text(text.to_string())];
    }

    fn has_child_elements(&self) -> bool {
        self.children
            .iter()
            .any(|node| matches!(node, XmlNode::Element(_)))
    }
}

/// Path segments below the root. A leading segment naming the root is skipped.
fn below_root<'p>(root: &XmlElement, segments: &'p [PathSegment]) -> &'p [PathSegment] {
    match segments.first() {
        Some(PathSegment::Element(name)) if *name == root.name => &segments[1..],
        _ => segments,
    }
}

pub(crate) fn resolve(root: &XmlElement, segments: &[PathSegment], lenient: bool) -> String {
    let segments = below_root(root, segments);
    let mut current = root;

    for (i, segment) in segments.iter().enumerate() {
        match segment {
            PathSegment::Element(name) => match current.child(name) {
                Some(child) => current = child,
                None => return String::new(),
            },
            PathSegment::Attribute(name) => {
                if i + 1 != segments.len() {
                    return String::new();
                }
                return match current.attribute(name) {
                    Some(value) => value.to_string(),
                    None if lenient => current.child(name).map(XmlElement::text).unwrap_or_default(),
                    None => String::new(),
                };
            }
        }
    }

    current.text()
}

pub(crate) fn set(root: &mut XmlElement, segments: &[PathSegment], value: &str) -> Result<(), EvalError> {
    let segments = below_root(root, segments);
    let Some((last, parents)) = segments.split_last() else {
        root.set_text(value);
        return Ok(());
    };

    let mut current = root;
    for segment in parents {
        current = current.child_or_insert(segment.name());
    }

    match last {
        PathSegment::Element(name) => current.child_or_insert(name).set_text(value),
        PathSegment::Attribute(name) => current.set_attribute(name, value),
    }
    Ok(())
}

fn xml_error(e: impl std::fmt::Display) -> DocumentError {
    DocumentError::Xml(e.to_string())
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement, DocumentError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(DocumentError::Xml("multiple root elements".to_string())),
    }
    Ok(())
}

/// Parses XML text into its document element.
///
/// Whitespace-only text is dropped from elements that also contain child
/// elements, so indentation does not leak into element values.
pub fn parse(text: &str) -> Result<XmlElement, DocumentError> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => stack.push(element_from(&e)?),
            Event::Empty(e) => {
                let element = element_from(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let Some(mut element) = stack.pop() else {
                    return Err(DocumentError::Xml("unbalanced end tag".to_string()));
                };
                if element.has_child_elements() {
                    element.children.retain(|node| {
                        !matches!(node, XmlNode::Text(t) if t.trim().is_empty())
                    });
                }
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(xml_error)?.into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Text(text)),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(DocumentError::Xml(
                            "text outside the document element".to_string(),
                        ));
                    }
                }
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::CData(text)),
                    None => {
                        return Err(DocumentError::Xml(
                            "CDATA outside the document element".to_string(),
                        ));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(DocumentError::Xml("unclosed element at end of input".to_string()));
    }
    root.ok_or_else(|| DocumentError::Xml("no document element".to_string()))
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), DocumentError> {
    let start = BytesStart::new(element.name.as_str()).with_attributes(
        element
            .attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str())),
    );

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(xml_error)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    for child in &element.children {
        match child {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(t) => writer
                .write_event(Event::Text(BytesText::new(t)))
                .map_err(xml_error)?,
            XmlNode::CData(t) => writer
                .write_event(Event::CData(BytesCData::new(t.as_str())))
                .map_err(xml_error)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(xml_error)?;
    Ok(())
}

/// Renders the tree as indented XML with a declaration.
pub fn render(root: &XmlElement) -> Result<String, DocumentError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    write_element(&mut writer, root)?;
    String::from_utf8(writer.into_inner()).map_err(xml_error)
}
