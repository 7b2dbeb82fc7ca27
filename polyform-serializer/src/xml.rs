//! XML-shaped tagged-tree backing: an owned element tree, printed and
//! parsed with quick-xml.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::archive::{ArchiveNode, Scalar, ScalarKind, CLASS_NAME, SIZE_NAME};
use crate::error::{ArchiveError, Result};
use crate::registry::{PolyRegistry, XML_REGISTRY};

/// Positional children carry this tag when no member name applies.
pub const ITEM_NAME: &str = "item";

/// One element of the tagged tree: a tag, ordered attributes, optional text
/// content and ordered child elements. Primitive payloads live in the text;
/// `Class`, `Index` and `Size` are attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        XmlElement {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any previous value for the same key.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }
}

impl ArchiveNode for XmlElement {
    fn put_scalar(&mut self, value: Scalar) -> Result<()> {
        self.text = match value {
            Scalar::Bool(v) => Some(v.to_string()),
            Scalar::Char(v) => Some(v.to_string()),
            Scalar::I8(v) => Some(v.to_string()),
            Scalar::I16(v) => Some(v.to_string()),
            Scalar::I32(v) => Some(v.to_string()),
            Scalar::I64(v) => Some(v.to_string()),
            Scalar::U8(v) => Some(v.to_string()),
            Scalar::U16(v) => Some(v.to_string()),
            Scalar::U32(v) => Some(v.to_string()),
            Scalar::U64(v) => Some(v.to_string()),
            Scalar::F32(v) => Some(v.to_string()),
            Scalar::F64(v) => Some(v.to_string()),
            Scalar::Str(v) => Some(v),
            // the empty-sum placeholder is an empty element
            Scalar::Unit => None,
            Scalar::Enum { name, .. } => Some(name.to_string()),
            // the tagged tree is a textual format: canonical string form
            Scalar::Timestamp { text, .. } => Some(text),
        };
        Ok(())
    }

    fn take_scalar(&mut self, kind: ScalarKind) -> Result<Scalar> {
        let text = self.text.as_deref().unwrap_or("");
        fn parse<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
            text.parse()
                .map_err(|_| ArchiveError::Decode(format!("cannot parse {text:?} as {what}")))
        }
        let scalar = match kind {
            ScalarKind::Bool => match text {
                "true" | "1" => Scalar::Bool(true),
                "false" | "0" => Scalar::Bool(false),
                other => {
                    return Err(ArchiveError::Decode(format!(
                        "cannot parse {other:?} as boolean"
                    )))
                }
            },
            ScalarKind::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Scalar::Char(c),
                    _ => {
                        return Err(ArchiveError::Decode(format!(
                            "expected a single character, found {text:?}"
                        )))
                    }
                }
            }
            ScalarKind::I8 => Scalar::I8(parse(text, "i8")?),
            ScalarKind::I16 => Scalar::I16(parse(text, "i16")?),
            ScalarKind::I32 => Scalar::I32(parse(text, "i32")?),
            ScalarKind::I64 => Scalar::I64(parse(text, "i64")?),
            ScalarKind::U8 => Scalar::U8(parse(text, "u8")?),
            ScalarKind::U16 => Scalar::U16(parse(text, "u16")?),
            ScalarKind::U32 => Scalar::U32(parse(text, "u32")?),
            ScalarKind::U64 => Scalar::U64(parse(text, "u64")?),
            ScalarKind::F32 => Scalar::F32(parse(text, "f32")?),
            ScalarKind::F64 => Scalar::F64(parse(text, "f64")?),
            ScalarKind::Str => Scalar::Str(text.to_owned()),
            ScalarKind::Unit => Scalar::Unit,
            ScalarKind::Enum => match text.parse::<u64>() {
                Ok(ordinal) => Scalar::U64(ordinal),
                Err(_) => Scalar::Str(text.to_owned()),
            },
            ScalarKind::Timestamp => Scalar::Str(text.to_owned()),
        };
        Ok(scalar)
    }

    fn put_type_name(&mut self, name: &str) -> Result<()> {
        self.set_attribute(CLASS_NAME, name);
        Ok(())
    }

    fn take_type_name(&mut self) -> Result<String> {
        match self.attribute(CLASS_NAME) {
            Some(name) => Ok(name.to_string()),
            None => {
                log::warn!("element <{}> has no {CLASS_NAME} attribute", self.name);
                Ok(String::new())
            }
        }
    }

    fn put_tag(&mut self, key: &str, tag: u8) -> Result<()> {
        self.set_attribute(key, tag.to_string());
        Ok(())
    }

    fn take_tag(&mut self, key: &str) -> Result<u8> {
        let raw = self
            .attribute(key)
            .ok_or_else(|| ArchiveError::InvalidVariant(format!("missing {key} attribute")))?;
        raw.parse().map_err(|_| {
            ArchiveError::InvalidVariant(format!("{key} attribute {raw:?} is not a tag"))
        })
    }

    fn begin_items(&mut self, count: usize) -> Result<()> {
        self.set_attribute(SIZE_NAME, count.to_string());
        self.children.clear();
        Ok(())
    }

    fn item_count(&mut self) -> Result<usize> {
        match self.attribute(SIZE_NAME) {
            // Trust the declared size; absent children surface when addressed.
            Some(raw) => raw.parse().map_err(|_| {
                ArchiveError::Decode(format!("{SIZE_NAME} attribute {raw:?} is not a count"))
            }),
            None => Ok(self.children.len()),
        }
    }

    fn named(&mut self, key: &str) -> Result<&mut Self> {
        if let Some(position) = self.children.iter().position(|c| c.name == key) {
            return Ok(&mut self.children[position]);
        }
        self.children.push(XmlElement::new(key));
        Ok(self.children.last_mut().expect("just appended"))
    }

    fn at(&mut self, index: usize) -> Result<&mut Self> {
        while self.children.len() <= index {
            self.children.push(XmlElement::new(ITEM_NAME));
        }
        Ok(&mut self.children[index])
    }

    fn registry() -> &'static PolyRegistry<Self> {
        &XML_REGISTRY
    }
}

/// Print an element tree as an indented XML document fragment.
pub fn to_string(root: &XmlElement) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_element(&mut writer, root)?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| ArchiveError::Decode(format!("printed XML is not UTF-8: {e}")))
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    fn write_failed(error: impl std::fmt::Display) -> ArchiveError {
        ArchiveError::Decode(format!("XML write failed: {error}"))
    }
    if element.children.is_empty() && element.text.is_none() {
        writer
            .write_event(Event::Empty(start))
            .map_err(write_failed)?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(write_failed)?;
    if let Some(text) = &element.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_failed)?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(write_failed)?;
    Ok(())
}

/// Parse a document fragment back into an element tree. Comments, processing
/// instructions and inter-element whitespace are dropped.
pub fn parse(text: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(text);
    fn malformed(error: impl std::fmt::Display) -> ArchiveError {
        ArchiveError::Decode(format!("malformed XML: {error}"))
    }

    let mut stack: Vec<XmlElement> = Vec::new();
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(start) => {
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::Text(raw) => {
                let content = raw.unescape().map_err(malformed)?.into_owned();
                if content.trim().is_empty() {
                    continue;
                }
                if let Some(current) = stack.last_mut() {
                    current.text = Some(content);
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ArchiveError::Decode("unbalanced closing tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::Eof => {
                return Err(ArchiveError::Decode(
                    "document ended before its root element closed".to_string(),
                ))
            }
            // declarations, comments, PIs, CDATA wrappers
            _ => continue,
        }
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement> {
    let decode = |e: String| ArchiveError::Decode(e);
    let name = String::from_utf8(start.name().as_ref().to_vec())
        .map_err(|e| decode(format!("element name is not UTF-8: {e}")))?;
    let mut element = XmlElement::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| decode(format!("malformed attribute: {e}")))?;
        let key = String::from_utf8(attribute.key.as_ref().to_vec())
            .map_err(|e| decode(format!("attribute key is not UTF-8: {e}")))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| decode(format!("malformed attribute value: {e}")))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}
