//! Minimal element tree over quick-xml events
//!
//! Application documents and stylesheets are read into an [`XmlElement`]
//! tree so handlers can walk, query and rewrite them, then written back out.
//! Comments, processing instructions and the prolog are not preserved.

use crate::error::{DeployError, DeployResult};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

/// Node content of an element
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its attributes and children, in document order
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(XmlNode::Text(text.to_string()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Parse a document and return its root element
    pub fn parse(xml: &str) -> DeployResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(element_from(&start)?),
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        DeployError::unexpected("Unbalanced end tag in XML document")
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Text(text.unescape()?.into_owned()));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                        parent.children.push(XmlNode::Text(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DeployError::unexpected(
                "XML document ended inside an open element",
            ));
        }
        root.ok_or_else(|| DeployError::unexpected("XML document has no root element"))
    }

    /// Serialize the tree, without an XML declaration
    pub fn to_xml(&self) -> DeployResult<String> {
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, self)?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| DeployError::unexpected(format!("Serialized XML is not UTF-8: {}", e)))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    /// Concatenated direct text content
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Replace the direct text content, keeping child elements
    pub fn set_text(&mut self, text: &str) {
        self.children.retain(|node| matches!(node, XmlNode::Element(_)));
        self.children.insert(0, XmlNode::Text(text.to_string()));
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child with the given name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// Every element of the subtree with the given name, self included, in
    /// document order
    pub fn find_all(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        if self.name == name {
            found.push(self);
        }
        for child in self.elements() {
            child.collect_named(name, found);
        }
    }

    /// Visit every element of the subtree mutably, parents before children
    pub fn visit_mut(&mut self, visit: &mut dyn FnMut(&mut XmlElement)) {
        visit(self);
        for node in &mut self.children {
            if let XmlNode::Element(child) = node {
                child.visit_mut(visit);
            }
        }
    }

    /// Visit every element of the subtree, parents before children
    pub fn visit(&self, visit: &mut dyn FnMut(&XmlElement)) {
        visit(self);
        for child in self.elements() {
            child.visit(visit);
        }
    }
}

fn element_from(start: &BytesStart<'_>) -> DeployResult<XmlElement> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> DeployResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(DeployError::unexpected(
                "XML document has more than one root element",
            ));
        }
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> DeployResult<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .map_err(DeployError::unexpected)?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(DeployError::unexpected)?;
    for node in &element.children {
        match node {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(DeployError::unexpected)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(DeployError::unexpected)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP: &str = r#"<?xml version="1.0"?>
<PSXApplication name="rffBrief">
  <PSXExtensionCall id="1">
    <name>Java/global/percussion/generic/sys_MakeAbsLink</name>
  </PSXExtensionCall>
  <PSXUrlRequest href="../sys_resources/images/logo.gif"/>
  <PSXTextLiteral><text>a &amp; b</text></PSXTextLiteral>
</PSXApplication>"#;

    #[test]
    fn parses_attributes_text_and_nesting() {
        let root = XmlElement::parse(APP).unwrap();
        assert_eq!(root.name, "PSXApplication");
        assert_eq!(root.attr("name"), Some("rffBrief"));
        let call = root.child("PSXExtensionCall").unwrap();
        assert_eq!(
            call.child("name").unwrap().text(),
            "Java/global/percussion/generic/sys_MakeAbsLink"
        );
        assert_eq!(root.find_all("text")[0].text(), "a & b");
        assert_eq!(
            root.find_all("PSXUrlRequest")[0].attr("href"),
            Some("../sys_resources/images/logo.gif")
        );
    }

    #[test]
    fn rewritten_tree_serializes_back() {
        let mut root = XmlElement::parse(APP).unwrap();
        root.visit_mut(&mut |e: &mut XmlElement| {
            if e.name == "text" {
                e.set_text("x < y");
            }
        });
        let xml = root.to_xml().unwrap();
        assert!(xml.contains("x &lt; y"));
        let reparsed = XmlElement::parse(&xml).unwrap();
        assert_eq!(reparsed.find_all("text")[0].text(), "x < y");
    }

    #[test]
    fn rejects_unbalanced_documents() {
        assert!(XmlElement::parse("<a><b></a>").is_err());
        assert!(XmlElement::parse("").is_err());
    }
}
