//! Reading, modifying and writing of invoice XML documents.

use std::{
    borrow::Cow,
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    str::FromStr,
};

use log::{debug, warn};
use quick_xml::{
    Reader,
    Writer,
    escape::escape,
    events::{
        BytesCData,
        BytesDecl,
        BytesEnd,
        BytesStart,
        BytesText,
        Event,
        attributes::Attribute,
    },
    name::QName,
};

use crate::{
    fields::{AttributeSource, ElementSource, INVOICE_ELEMENT},
    generator::Iic,
};

/// The attribute of the invoice element holding the IIC.
pub const IIC_ATTRIBUTE: &str = "IIC";

/// The attribute of the invoice element holding the IIC signature.
pub const IIC_SIGNATURE_ATTRIBUTE: &str = "IICSignature";

/// An error that may occur when handling an [`InvoiceDocument`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A document file can not be read or written.
    #[error("I/O error for file {path} while {context}:\n{source}")]
    Io {
        /// The path of the file.
        path: PathBuf,

        /// The context in which the error occurred.
        ///
        /// This is meant to complete the sentence "I/O error for file {path} while ".
        context: &'static str,

        /// The source error.
        source: std::io::Error,
    },

    /// A document can not be parsed.
    #[error("XML error while {context}:\n{source}")]
    XmlRead {
        /// The context in which the error occurred.
        ///
        /// This is meant to complete the sentence "XML error while ".
        context: &'static str,

        /// The source error.
        source: quick_xml::Error,
    },

    /// A document can not be serialized.
    #[error("XML error while {context}:\n{source}")]
    XmlWrite {
        /// The context in which the error occurred.
        ///
        /// This is meant to complete the sentence "XML error while ".
        context: &'static str,

        /// The source error.
        source: quick_xml::Error,
    },

    /// A document contains data that is not valid UTF-8.
    #[error("Invalid UTF-8 while {context}:\n{source}")]
    Utf8 {
        /// The context in which the error occurred.
        ///
        /// This is meant to complete the sentence "Invalid UTF-8 while ".
        context: &'static str,

        /// The source error.
        source: std::str::Utf8Error,
    },

    /// A document is not well-formed.
    #[error("The document is malformed: {reason}")]
    Malformed {
        /// The reason for which the document is rejected.
        reason: &'static str,
    },

    /// A document has no root element.
    #[error("The document has no root element")]
    MissingRoot,

    /// An element that is required for an operation is missing.
    #[error("The document has no {element} element")]
    ElementMissing {
        /// The name of the missing element.
        element: &'static str,
    },
}

/// A node in the content of an [`Element`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    /// A child element.
    Element(Element),

    /// Unescaped character data.
    Text(String),

    /// A CDATA section.
    CData(String),

    /// A comment.
    Comment(String),
}

/// An XML element with its attributes and content.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Creates a new [`Element`] without attributes and content.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns the qualified name of the element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the element without namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name
            .rsplit_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Returns the attributes of the element as name/value pairs in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the content of the element.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Appends `node` to the content of the element.
    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Removes the attribute `name` and returns its value, if it was set.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let position = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(position).1)
    }

    /// Sets the attribute `name` to `value`.
    ///
    /// An existing attribute of the same name is removed first, so the attribute is always
    /// the last one of the element and never present twice.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove_attribute(&name);
        self.attributes.push((name, value.into()));
    }

    /// Returns the first element in document order, whose local name is `name`.
    ///
    /// The element itself is considered first, followed by its descendants.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.local_name() == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| match child {
            Node::Element(element) => element.find(name),
            _ => None,
        })
    }

    /// Returns the first element in document order, whose local name is `name`, mutably.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Element> {
        if self.local_name() == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| match child {
            Node::Element(element) => element.find_mut(name),
            _ => None,
        })
    }

    fn from_start(start: &BytesStart) -> Result<Self, Error> {
        let mut element = Self::new(utf8(start.name().as_ref(), "reading an element name")?);
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|source| Error::XmlRead {
                context: "reading an attribute",
                source: source.into(),
            })?;
            let key = utf8(attribute.key.as_ref(), "reading an attribute name")?;
            let value = attribute
                .unescape_value()
                .map_err(|source| Error::XmlRead {
                    context: "unescaping an attribute value",
                    source: source.into(),
                })?;
            element
                .attributes
                .push((key.to_string(), value.into_owned()));
        }
        Ok(element)
    }

    fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<(), Error> {
        let mut start = BytesStart::new(self.name.as_str());
        for (name, value) in &self.attributes {
            start.push_attribute(Attribute {
                key: QName(name.as_bytes()),
                value: Cow::Owned(escape_attribute_value(value).into_bytes()),
            });
        }
        if self.children.is_empty() {
            return write_event(writer, Event::Empty(start));
        }

        write_event(writer, Event::Start(start))?;
        for child in &self.children {
            match child {
                Node::Element(element) => element.write_to(writer)?,
                Node::Text(text) => write_event(writer, Event::Text(BytesText::new(text)))?,
                Node::CData(data) => write_event(writer, Event::CData(BytesCData::new(data)))?,
                Node::Comment(comment) => write_event(
                    writer,
                    Event::Comment(BytesText::from_escaped(comment.as_str())),
                )?,
            }
        }
        write_event(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}

impl AttributeSource for Element {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// An invoice XML document held in memory.
///
/// The XML declaration, comments preceding the root element and the root element with all
/// of its content are kept.
/// Whitespace between elements is not kept and is replaced by tab indentation when
/// serializing.
#[derive(Clone, Debug)]
pub struct InvoiceDocument {
    declaration: Option<BytesDecl<'static>>,
    prolog: Vec<String>,
    root: Element,
}

impl InvoiceDocument {
    /// Creates a new [`InvoiceDocument`] from a `root` element.
    pub fn new(root: Element) -> Self {
        Self {
            declaration: Some(BytesDecl::new("1.0", Some("UTF-8"), None)),
            prolog: Vec::new(),
            root,
        }
    }

    /// Reads an [`InvoiceDocument`] from the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if
    /// - the file at `path` can not be read,
    /// - or its contents are not a well-formed XML document.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        debug!("Reading invoice document {}", path.display());
        let xml = read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            context: "reading an invoice document",
            source,
        })?;
        xml.parse()
    }

    /// Returns the root element.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Sets the `IIC` and `IICSignature` attributes of the invoice element.
    ///
    /// Existing values are replaced.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::ElementMissing`] if the document has no invoice element.
    pub fn embed_iic(&mut self, iic: &Iic) -> Result<(), Error> {
        let invoice = self
            .root
            .find_mut(INVOICE_ELEMENT)
            .ok_or(Error::ElementMissing {
                element: INVOICE_ELEMENT,
            })?;
        invoice.set_attribute(IIC_ATTRIBUTE, iic.code());
        invoice.set_attribute(IIC_SIGNATURE_ATTRIBUTE, iic.signature());
        Ok(())
    }

    /// Serializes the document with tab indentation.
    ///
    /// Nothing follows the closing tag of the root element.
    ///
    /// # Errors
    ///
    /// Returns an error if the document can not be serialized.
    pub fn to_xml_string(&self) -> Result<String, Error> {
        let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
        if let Some(declaration) = &self.declaration {
            write_event(&mut writer, Event::Decl(declaration.clone()))?;
        }
        for comment in &self.prolog {
            write_event(
                &mut writer,
                Event::Comment(BytesText::from_escaped(comment.as_str())),
            )?;
        }
        self.root.write_to(&mut writer)?;

        String::from_utf8(writer.into_inner()).map_err(|source| Error::Utf8 {
            context: "serializing a document",
            source: source.utf8_error(),
        })
    }

    /// Writes the document to the file at `path`.
    ///
    /// An existing file is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if
    /// - the document can not be serialized,
    /// - or the file at `path` can not be written.
    pub fn write_to_file(&self, path: &Path) -> Result<(), Error> {
        let xml = self.to_xml_string()?;
        debug!("Writing invoice document {}", path.display());
        write(path, xml).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            context: "writing an invoice document",
            source,
        })
    }
}

impl FromStr for InvoiceDocument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut reader = Reader::from_str(s);

        let mut declaration = None;
        let mut prolog = Vec::new();
        let mut open: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            let event = reader.read_event().map_err(|source| Error::XmlRead {
                context: "parsing a document",
                source,
            })?;
            match event {
                Event::Decl(decl) => declaration = Some(decl.into_owned()),
                Event::Start(start) => open.push(Element::from_start(&start)?),
                Event::Empty(start) => {
                    close_element(Element::from_start(&start)?, &mut open, &mut root)?
                }
                Event::End(_) => {
                    let element = open.pop().ok_or(Error::Malformed {
                        reason: "closing tag without opening tag",
                    })?;
                    close_element(element, &mut open, &mut root)?;
                }
                Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => {}
                Event::Text(text) => {
                    let text = text.unescape().map_err(|source| Error::XmlRead {
                        context: "unescaping text",
                        source: source.into(),
                    })?;
                    match open.last_mut() {
                        Some(parent) => parent.push(Node::Text(text.into_owned())),
                        None => warn!("Skipping text outside of the root element"),
                    }
                }
                Event::CData(data) => {
                    let data = utf8(&data, "reading a CDATA section")?;
                    match open.last_mut() {
                        Some(parent) => parent.push(Node::CData(data.to_string())),
                        None => warn!("Skipping CDATA outside of the root element"),
                    }
                }
                Event::Comment(comment) => {
                    let comment = utf8(&comment, "reading a comment")?.to_string();
                    match open.last_mut() {
                        Some(parent) => parent.push(Node::Comment(comment)),
                        None if root.is_none() => prolog.push(comment),
                        None => debug!("Skipping comment after the root element"),
                    }
                }
                Event::PI(_) => warn!("Skipping processing instruction"),
                Event::DocType(_) => warn!("Skipping document type declaration"),
                Event::Eof => break,
            }
        }

        if !open.is_empty() {
            return Err(Error::Malformed {
                reason: "unclosed element at end of document",
            });
        }
        let root = root.ok_or(Error::MissingRoot)?;

        Ok(Self {
            declaration,
            prolog,
            root,
        })
    }
}

impl ElementSource for InvoiceDocument {
    type Element = Element;

    fn find_element(&self, name: &str) -> Option<&Self::Element> {
        self.root.find(name)
    }
}

/// Attaches a completed `element` to its parent, or makes it the root.
fn close_element(
    element: Element,
    open: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), Error> {
    match open.last_mut() {
        Some(parent) => parent.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(Error::Malformed {
                reason: "more than one root element",
            });
        }
    }
    Ok(())
}

/// Escapes `value` for use in a double quoted attribute.
///
/// Line breaks and tabs are written as character references, as XML parsers normalize them
/// to spaces otherwise.
fn escape_attribute_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for char in escape(value).chars() {
        match char {
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            char => escaped.push(char),
        }
    }
    escaped
}

fn utf8<'a>(bytes: &'a [u8], context: &'static str) -> Result<&'a str, Error> {
    std::str::from_utf8(bytes).map_err(|source| Error::Utf8 { context, source })
}

fn write_event<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), Error> {
    writer
        .write_event(event)
        .map_err(|source| Error::XmlWrite {
            context: "serializing a document",
            source: quick_xml::Error::from(source),
        })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use testdir::testdir;
    use testresult::TestResult;

    use super::*;
    use crate::InvoiceFields;

    const INVOICE: &str = include_str!("../tests/fixtures/invoice.xml");

    #[test]
    fn fields_are_read_from_invoice() -> TestResult {
        let document: InvoiceDocument = INVOICE.parse()?;

        let fields = InvoiceFields::extract(&document)?;

        assert_eq!(
            fields.plain_text().as_str(),
            "123456789|2023-01-01T10:00:00|1|BU1|TCR1|SC1|100.00"
        );

        Ok(())
    }

    #[rstest]
    #[case("<Invoice/>", "Invoice")]
    #[case("<ns:Invoice xmlns:ns=\"urn:example\"/>", "ns:Invoice")]
    #[case("<Root><a:Seller xmlns:a=\"urn:a\"/><Invoice/></Root>", "Invoice")]
    fn elements_are_found_by_local_name(#[case] xml: &str, #[case] name: &str) -> TestResult {
        let document: InvoiceDocument = xml.parse()?;

        assert_eq!(
            document.find_element("Invoice").map(Element::name),
            Some(name)
        );

        Ok(())
    }

    #[test]
    fn first_element_in_document_order_is_found() -> TestResult {
        let document: InvoiceDocument =
            r#"<R><A><Seller IDNum="1"/></A><Seller IDNum="2"/></R>"#.parse()?;

        assert_eq!(
            document
                .find_element("Seller")
                .and_then(|seller| seller.attribute("IDNum")),
            Some("1")
        );

        Ok(())
    }

    #[test]
    fn embedding_twice_keeps_one_attribute_each() -> TestResult {
        let mut document: InvoiceDocument = INVOICE.parse()?;

        document.embed_iic(&Iic::from_signature(&[0x01; 256]))?;
        let iic = Iic::from_signature(&[0x02; 256]);
        document.embed_iic(&iic)?;

        let reparsed: InvoiceDocument = document.to_xml_string()?.parse()?;
        let invoice = reparsed
            .find_element(INVOICE_ELEMENT)
            .ok_or("no invoice element")?;
        let names: Vec<&str> = invoice.attributes().map(|(name, _)| name).collect();
        assert_eq!(
            names.iter().filter(|name| **name == IIC_ATTRIBUTE).count(),
            1
        );
        assert_eq!(
            names
                .iter()
                .filter(|name| **name == IIC_SIGNATURE_ATTRIBUTE)
                .count(),
            1
        );
        assert_eq!(invoice.attribute(IIC_ATTRIBUTE), Some(iic.code()));
        assert_eq!(
            invoice.attribute(IIC_SIGNATURE_ATTRIBUTE),
            Some(iic.signature())
        );

        Ok(())
    }

    #[test]
    fn embedding_without_invoice_fails() -> TestResult {
        let mut document: InvoiceDocument = "<Receipt/>".parse()?;

        assert!(matches!(
            document.embed_iic(&Iic::from_signature(&[0x01])),
            Err(Error::ElementMissing {
                element: INVOICE_ELEMENT
            })
        ));

        Ok(())
    }

    #[test]
    fn serialization_is_tab_indented() -> TestResult {
        let mut root = Element::new("Root");
        let mut invoice = Element::new("Invoice");
        invoice.set_attribute("InvOrdNum", "1");
        invoice.push(Node::Element(Element::new("Seller")));
        root.push(Node::Element(invoice));
        root.push(Node::Comment(" end ".to_string()));

        assert_eq!(
            InvoiceDocument::new(root).to_xml_string()?,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <Root>\n\
             \t<Invoice InvOrdNum=\"1\">\n\
             \t\t<Seller/>\n\
             \t</Invoice>\n\
             \t<!-- end -->\n\
             </Root>"
        );

        Ok(())
    }

    #[test]
    fn content_survives_serialization() -> TestResult {
        let xml = r#"<R a="x &amp; y"><T>1 &lt; 2</T><C><![CDATA[<raw>]]></C><!-- note --></R>"#;
        let document: InvoiceDocument = xml.parse()?;

        let reparsed: InvoiceDocument = document.to_xml_string()?.parse()?;

        assert_eq!(reparsed.root(), document.root());
        assert_eq!(reparsed.root().attribute("a"), Some("x & y"));
        assert_eq!(
            reparsed.find_element("T").map(Element::children),
            Some([Node::Text("1 < 2".to_string())].as_slice())
        );

        Ok(())
    }

    #[test]
    fn text_is_kept_verbatim() -> TestResult {
        let document: InvoiceDocument =
            "<R>\n\t<Note>  Paid in cash </Note>\n\t<Empty>   </Empty>\n</R>".parse()?;

        let written = document.to_xml_string()?;
        let reparsed: InvoiceDocument = written.parse()?;

        assert!(written.contains("<Note>  Paid in cash </Note>"));
        assert_eq!(
            reparsed.find_element("Note").map(Element::children),
            Some([Node::Text("  Paid in cash ".to_string())].as_slice())
        );
        assert_eq!(
            reparsed.find_element("Empty").map(Element::children),
            Some([].as_slice())
        );

        Ok(())
    }

    #[rstest]
    #[case("x&#10;y", "x\ny", "x&#10;y")]
    #[case("a&#13;&#10;b", "a\r\nb", "a&#13;&#10;b")]
    #[case("&#9;tab", "\ttab", "&#9;tab")]
    #[case("&quot;&lt;&amp;", "\"<&", "&quot;&lt;&amp;")]
    fn attribute_whitespace_is_escaped(
        #[case] escaped: &str,
        #[case] value: &str,
        #[case] written: &str,
    ) -> TestResult {
        let document: InvoiceDocument = format!("<R a=\"{escaped}\"/>").parse()?;
        assert_eq!(document.root().attribute("a"), Some(value));

        let xml = document.to_xml_string()?;

        assert!(xml.contains(&format!("a=\"{written}\"")));
        assert_eq!(
            xml.parse::<InvoiceDocument>()?.root().attribute("a"),
            Some(value)
        );

        Ok(())
    }

    #[test]
    fn set_attribute_moves_attribute_to_end() -> TestResult {
        let mut element = Element::new("Invoice");
        element.set_attribute("IIC", "old");
        element.set_attribute("TotPrice", "1.00");
        element.set_attribute("IIC", "new");

        assert_eq!(
            element.attributes().collect::<Vec<_>>(),
            vec![("TotPrice", "1.00"), ("IIC", "new")]
        );
        assert_eq!(element.remove_attribute("IIC"), Some("new".to_string()));
        assert_eq!(element.remove_attribute("IIC"), None);

        Ok(())
    }

    #[rstest]
    #[case("")]
    #[case("<?xml version=\"1.0\"?>")]
    #[case("<!-- only a comment -->")]
    fn document_without_root_is_rejected(#[case] xml: &str) -> TestResult {
        assert!(matches!(
            xml.parse::<InvoiceDocument>(),
            Err(Error::MissingRoot)
        ));

        Ok(())
    }

    #[rstest]
    #[case("<A></B>")]
    #[case("<A>")]
    #[case("<A/><B/>")]
    #[case("<A b=\"1\" b=\"2\"/>")]
    fn malformed_documents_are_rejected(#[case] xml: &str) -> TestResult {
        assert!(xml.parse::<InvoiceDocument>().is_err());

        Ok(())
    }

    #[test]
    fn document_file_round_trip() -> TestResult {
        let dir = testdir!();
        let input = dir.join("input.xml");
        let output = dir.join("output.xml");
        write(&input, INVOICE)?;

        let document = InvoiceDocument::from_file(&input)?;
        document.write_to_file(&output)?;
        let written = read_to_string(&output)?;

        assert!(written.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(written.ends_with("</RegisterInvoiceRequest>"));
        assert!(written.contains("\n\t<!-- invoice issued by TCR1 -->\n"));
        assert_eq!(
            InvoiceFields::extract(&InvoiceDocument::from_file(&output)?)?,
            InvoiceFields::extract(&document)?
        );

        Ok(())
    }

    #[test]
    fn missing_file_is_reported_with_path() -> TestResult {
        let path = testdir!().join("missing.xml");

        match InvoiceDocument::from_file(&path) {
            Err(Error::Io { path: error_path, .. }) => assert_eq!(error_path, path),
            other => return Err(format!("unexpected result: {other:?}").into()),
        }

        Ok(())
    }
}
