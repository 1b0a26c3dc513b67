//local shortcuts

//third-party shortcuts
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

//standard shortcuts
use core::fmt::Debug;
use std::collections::BTreeMap;
use std::io::Cursor;

//-------------------------------------------------------------------------------------------------------------------

/// In-memory representation of one XML element, the unit the session subsystem sends and receives.
///
/// This isolates the rest of the crate from the XML crate used for the wire encoding (currently `quick-xml`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlNode
{
    /// element name (the protocol verb, e.g. `"user-join"`)
    pub name: String,
    /// element attributes, in a deterministic order for reproducible encoding
    pub attrs: BTreeMap<String, String>,
    /// child elements
    pub children: Vec<XmlNode>,
}

impl XmlNode
{
    /// Makes a new, childless, attribute-less node with the given name.
    pub fn new(name: impl Into<String>) -> Self
    {
        Self{ name: name.into(), attrs: BTreeMap::default(), children: Vec::default() }
    }

    /// Sets an attribute, returning `self` for chaining.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self
    {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Gets a string attribute.
    pub fn attr(&self, key: &str) -> Option<&str>
    {
        self.attrs.get(key).map(String::as_str)
    }

    /// Gets a `u32` attribute.
    ///
    /// Returns `Ok(None)` if the attribute is absent. Returns `Err` if the attribute is present but is not a
    /// strict, unsigned, base-10 integer (no leading `+`, no leading zeros other than a bare `"0"`, no whitespace).
    pub fn attr_u32(&self, key: &str) -> Result<Option<u32>, ()>
    {
        match self.attrs.get(key)
        {
            None => Ok(None),
            Some(raw) =>
            {
                if raw.is_empty() { return Err(()); }
                if raw.len() > 1 && raw.starts_with('0') { return Err(()); }
                if !raw.bytes().all(|b| b.is_ascii_digit()) { return Err(()); }
                raw.parse::<u32>().map(Some).map_err(|_| ())
            }
        }
    }

    /// Encodes the `seq` attribute as an unsigned decimal integer with no leading zeros.
    pub fn with_seq(self, seq: u32) -> Self
    {
        self.with_attr("seq", seq.to_string())
    }

    /// Serializes this node (and its children) as UTF-8 XML text.
    ///
    /// Used both for the wire encoding and for logging malformed/unprocessable frames.
    pub fn to_xml_string(&self) -> String
    {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write(&mut writer).expect("in-memory XML writer cannot fail");
        String::from_utf8(writer.into_inner().into_inner()).expect("xml writer only emits valid utf-8")
    }

    fn write(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> quick_xml::Result<()>
    {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attrs
        {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty()
        {
            writer.write_event(Event::Empty(start))?;
        }
        else
        {
            writer.write_event(Event::Start(start))?;
            for child in &self.children
            {
                child.write(writer)?;
            }
            writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        }

        Ok(())
    }

    /// Parses a single top-level element from UTF-8 XML text.
    pub fn parse(xml: &str) -> Result<Self, XmlParseError>
    {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop
        {
            match reader.read_event().map_err(|_| XmlParseError::Malformed)?
            {
                Event::Start(start) =>
                {
                    stack.push(Self::from_bytes_start(&start)?);
                }
                Event::Empty(start) =>
                {
                    let node = Self::from_bytes_start(&start)?;
                    Self::attach(&mut stack, &mut root, node)?;
                }
                Event::End(_) =>
                {
                    let node = stack.pop().ok_or(XmlParseError::Malformed)?;
                    Self::attach(&mut stack, &mut root, node)?;
                }
                Event::Text(text) =>
                {
                    // text content is not part of this protocol's data model; ignore it
                    let _: BytesText = text;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        root.ok_or(XmlParseError::Empty)
    }

    fn from_bytes_start(start: &BytesStart) -> Result<Self, XmlParseError>
    {
        let name = String::from_utf8(start.name().as_ref().to_vec()).map_err(|_| XmlParseError::Malformed)?;
        let mut node = XmlNode::new(name);

        for attr in start.attributes()
        {
            let attr = attr.map_err(|_| XmlParseError::Malformed)?;
            let key = String::from_utf8(attr.key.as_ref().to_vec()).map_err(|_| XmlParseError::Malformed)?;
            let value = attr.unescape_value().map_err(|_| XmlParseError::Malformed)?.into_owned();
            node.attrs.insert(key, value);
        }

        Ok(node)
    }

    fn attach(stack: &mut Vec<XmlNode>, root: &mut Option<XmlNode>, node: XmlNode) -> Result<(), XmlParseError>
    {
        match stack.last_mut()
        {
            Some(parent) => parent.children.push(node),
            None =>
            {
                if root.is_some() { return Err(XmlParseError::Malformed); }
                *root = Some(node);
            }
        }
        Ok(())
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Error returned when a byte stream could not be parsed as a single XML element.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum XmlParseError
{
    /// the input contained no element at all
    Empty,
    /// the input was not well-formed XML
    Malformed,
}

impl std::fmt::Display for XmlParseError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        let _ = write!(f, "XmlParseError::");
        match self
        {
            XmlParseError::Empty     => write!(f, "Empty"),
            XmlParseError::Malformed => write!(f, "Malformed"),
        }
    }
}
impl std::error::Error for XmlParseError {}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------
