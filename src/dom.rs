//! Document Tree Module
//!
//! This module holds the in-memory tree of a single HTML or XHTML document and the
//! markup codec that converts between markup strings and that tree.
//!
//! ## Node model
//!
//! A [Document] is an ordered list of [Node]s. Only [Node::Element] and
//! [Node::Text] take part in the bionic transformation; every other variant
//! carries markup that is written back exactly as it was read.
//!
//! ## Parsing
//!
//! [XmlCodec] is built on `quick_xml` and accepts XHTML as well as the common
//! HTML leniencies found in e-books:
//! - void elements such as `<br>` or `<meta ...>` never open a scope;
//! - an end tag closes every element opened after its matching start tag,
//!   stray end tags are dropped and unclosed elements close at end of input;
//! - the bodies of `script` and `style` are kept verbatim;
//! - end tags HTML lets authors omit are implied: a new `<li>` closes the open
//!   item, and a `<p>` or block element closes an open paragraph;
//! - character references, the predefined XML entities and the HTML5 named
//!   entities are resolved into text, unknown names are kept as [Node::Reference].
//!
//! Elements nested deeper than [MAX_NESTING_DEPTH] are rejected with
//! [BionicError::NestingTooDeep].
//!
//! Errors the reader cannot recover from (an unterminated tag, a broken attribute
//! list) are reported as [BionicError::ParseError].

use std::io::{Cursor, Write};

use log::debug;
use quick_xml::{
    Reader, Writer,
    escape::{escape, partial_escape, resolve_html5_entity, resolve_xml_entity, unescape},
    events::{BytesCData, BytesEnd, BytesStart, BytesText, Event},
};

use crate::error::BionicError;

/// Elements that never have content in HTML
pub const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is read and written verbatim
pub const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// Deepest element nesting accepted by [XmlCodec]
///
/// Tree passes are recursive, so deeper documents are rejected as
/// [BionicError::NestingTooDeep] instead of exhausting a worker's stack.
pub const MAX_NESTING_DEPTH: usize = 1024;

/// Start tags that close an open `<p>`
const CLOSES_PARAGRAPH: [&str; 30] = [
    "address", "article", "aside", "blockquote", "details", "dialog", "div", "dl", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hgroup", "hr", "main", "menu", "nav", "ol", "p", "pre", "section", "ul",
];

/// Elements that keep an outer `<p>` from being closed by their content
const PARAGRAPH_BOUNDARIES: [&str; 9] = [
    "applet", "button", "caption", "html", "marquee", "object", "table", "td", "th",
];

/// A node of a document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),

    /// Character data, stored unescaped
    Text(String),

    /// Verbatim content of a `script` or `style` element
    RawText(String),

    Comment(String),

    CData(String),

    /// An entity reference that could not be resolved, stored without `&` and `;`
    Reference(String),

    /// The XML declaration or a processing instruction, stored without `<?` and `?>`
    Instruction(String),

    /// A document type declaration, stored without `<!DOCTYPE` and `>`
    DocType(String),
}

impl Node {
    /// Create a text node
    pub fn text(content: &str) -> Self {
        Node::Text(content.to_string())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// Represents an element node of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// The qualified name as written in the source, e.g. `p` or `epub:switch`
    pub name: String,

    /// The attributes in source order
    ///
    /// Values are stored in their escaped form, exactly as they are written out.
    pub attributes: Vec<(String, String)>,

    /// The children of the element
    pub children: Vec<Node>,

    /// Whether an element without children is written as `<name/>`
    pub self_closing: bool,
}

impl Element {
    /// Create a new element
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    /// Create a new element that is written as `<name/>` when it has no children
    pub fn new_empty(name: &str) -> Self {
        Self {
            self_closing: true,
            ..Self::new(name)
        }
    }

    /// Get the local name of the element (excluding namespace prefix)
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Check the local name, ignoring ASCII case
    pub fn is(&self, name: &str) -> bool {
        self.local_name().eq_ignore_ascii_case(name)
    }

    /// Returns the unescaped value of the specified attribute
    pub fn get_attr(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| match unescape(value) {
                Ok(value) => value.into_owned(),
                Err(_) => value.clone(),
            })
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attr(&mut self, name: &str, value: &str) -> &mut Self {
        let value = escape(value).into_owned();
        match self
            .attributes
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some(attribute) => attribute.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }

        self
    }

    /// Builder form of [Element::set_attr]
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Append a child node
    pub fn with_child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    /// Gets the text content of the element and all its descendants
    pub fn text(&self) -> String {
        let mut result = String::new();
        collect_text(&self.children, &mut result);
        result
    }

    /// Find the first descendant element with the specified local name
    pub fn find_element_mut(&mut self, name: &str) -> Option<&mut Element> {
        find_element_mut(&mut self.children, name)
    }

    /// Find all descendant elements with the specified local name, in document order
    pub fn find_elements_by_name<'a>(&'a self, name: &'a str) -> ElementsByName<'a> {
        ElementsByName::new(&self.children, name)
    }
}

fn collect_text(nodes: &[Node], result: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) | Node::RawText(text) | Node::CData(text) => result.push_str(text),
            Node::Element(element) => collect_text(&element.children, result),
            _ => {}
        }
    }
}

fn find_element_mut<'a>(nodes: &'a mut [Node], name: &str) -> Option<&'a mut Element> {
    for node in nodes.iter_mut() {
        if let Node::Element(element) = node {
            if element.is(name) {
                return Some(element);
            }
            if let Some(found) = find_element_mut(&mut element.children, name) {
                return Some(found);
            }
        }
    }
    None
}

/// Depth-first iterator over the elements with a given local name
pub struct ElementsByName<'a> {
    stack: Vec<&'a Node>,
    target_name: &'a str,
}

impl<'a> ElementsByName<'a> {
    fn new(nodes: &'a [Node], name: &'a str) -> Self {
        Self {
            stack: nodes.iter().rev().collect(),
            target_name: name,
        }
    }
}

impl<'a> Iterator for ElementsByName<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            if let Node::Element(element) = node {
                self.stack.extend(element.children.iter().rev());
                if element.is(self.target_name) {
                    return Some(element);
                }
            }
        }
        None
    }
}

/// A parsed document
///
/// The document owns its nodes exclusively; it is created by a [MarkupCodec],
/// mutated in place and written back by the same codec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub children: Vec<Node>,
}

impl Document {
    /// Parse markup with the default [XmlCodec]
    pub fn parse(markup: &str) -> Result<Self, BionicError> {
        XmlCodec.parse(markup)
    }

    /// Serialize with the default [XmlCodec]
    pub fn to_markup(&self) -> Result<String, BionicError> {
        XmlCodec.serialize(self)
    }

    /// Find the first element with the specified local name
    pub fn find_element_mut(&mut self, name: &str) -> Option<&mut Element> {
        find_element_mut(&mut self.children, name)
    }

    /// Find all elements with the specified local name, in document order
    pub fn find_elements_by_name<'a>(&'a self, name: &'a str) -> ElementsByName<'a> {
        ElementsByName::new(&self.children, name)
    }
}

/// Converts between markup strings and [Document] trees
///
/// The tree walking code only relies on this contract, so any parser able to
/// produce [Node]s can be plugged into a
/// [BionicConverter](crate::converter::BionicConverter).
pub trait MarkupCodec: Send + Sync {
    fn parse(&self, markup: &str) -> Result<Document, BionicError>;

    fn serialize(&self, document: &Document) -> Result<String, BionicError>;
}

/// Markup codec backed by `quick_xml`
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

type XmlWriter = Writer<Cursor<Vec<u8>>>;

impl MarkupCodec for XmlCodec {
    fn parse(&self, markup: &str) -> Result<Document, BionicError> {
        let mut reader = Reader::from_str(markup);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.allow_dangling_amp = true;

        let mut document = Document::default();
        let mut stack = Vec::<Element>::new();

        loop {
            match reader.read_event()? {
                // End of file, stop the loop
                Event::Eof => break,

                Event::Start(e) => {
                    let mut element = Self::element_from_start(&e)?;
                    let local_name = element.local_name().to_ascii_lowercase();
                    close_implied(&mut stack, &mut document, &local_name);

                    if VOID_ELEMENTS.contains(&local_name.as_str()) {
                        element.self_closing = true;
                        append_node(&mut stack, &mut document, Node::Element(element));
                    } else if RAW_TEXT_ELEMENTS.contains(&local_name.as_str()) {
                        // The body is not markup; skip the reader past the end tag
                        let rest: &[u8] = *reader.get_ref();
                        let start = markup.len() - rest.len();
                        let (content_end, resume) = match find_raw_text_end(rest, &element.name) {
                            Some((content_end, close_end)) => (start + content_end, start + close_end),
                            None => (markup.len(), markup.len()),
                        };
                        if content_end > start {
                            let content = markup[start..content_end].to_string();
                            element.children.push(Node::RawText(content));
                        }
                        *reader.get_mut() = &markup.as_bytes()[resume..];
                        append_node(&mut stack, &mut document, Node::Element(element));
                    } else {
                        if stack.len() >= MAX_NESTING_DEPTH {
                            return Err(BionicError::NestingTooDeep {
                                limit: MAX_NESTING_DEPTH,
                            });
                        }
                        stack.push(element);
                    }
                }

                Event::Empty(e) => {
                    let mut element = Self::element_from_start(&e)?;
                    element.self_closing = true;
                    append_node(&mut stack, &mut document, Node::Element(element));
                }

                // Close every element opened after the matching start tag
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match stack
                        .iter()
                        .rposition(|open| open.name.eq_ignore_ascii_case(&name))
                    {
                        Some(position) => close_to(&mut stack, &mut document, position),
                        None => debug!("dropping stray end tag </{}>", name),
                    }
                }

                Event::Text(e) => {
                    push_text(&mut stack, &mut document, &String::from_utf8_lossy(&e));
                }

                Event::GeneralRef(e) => {
                    let entity = String::from_utf8_lossy(&e).to_string();
                    match resolve_entity(&entity) {
                        Some(resolved) => push_text(&mut stack, &mut document, &resolved),
                        None => append_node(&mut stack, &mut document, Node::Reference(entity)),
                    }
                }

                Event::CData(e) => {
                    let data = String::from_utf8_lossy(&e).to_string();
                    append_node(&mut stack, &mut document, Node::CData(data));
                }

                Event::Comment(e) => {
                    let comment = String::from_utf8_lossy(&e).to_string();
                    append_node(&mut stack, &mut document, Node::Comment(comment));
                }

                Event::Decl(e) => {
                    let decl = String::from_utf8_lossy(&e).to_string();
                    append_node(&mut stack, &mut document, Node::Instruction(decl));
                }

                Event::PI(e) => {
                    let instruction = String::from_utf8_lossy(&e).to_string();
                    append_node(&mut stack, &mut document, Node::Instruction(instruction));
                }

                Event::DocType(e) => {
                    let doctype = String::from_utf8_lossy(&e).trim().to_string();
                    append_node(&mut stack, &mut document, Node::DocType(doctype));
                }
            }
        }

        // Elements left open at end of input close implicitly
        while let Some(element) = stack.pop() {
            append_node(&mut stack, &mut document, Node::Element(element));
        }

        Ok(document)
    }

    fn serialize(&self, document: &Document) -> Result<String, BionicError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        for node in &document.children {
            Self::write_node(&mut writer, node)?;
        }

        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|err| BionicError::from(err.utf8_error()))
    }
}

impl XmlCodec {
    fn element_from_start(start: &BytesStart) -> Result<Element, BionicError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let mut element = Element::new(&name);

        for attr in start.html_attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            // Values are always written back in double quotes
            let value = String::from_utf8_lossy(&attr.value).replace('"', "&quot;");
            element.attributes.push((key, value));
        }

        Ok(element)
    }

    fn write_node(writer: &mut XmlWriter, node: &Node) -> Result<(), BionicError> {
        match node {
            Node::Element(element) => {
                let mut start = BytesStart::new(element.name.as_str());
                for (key, value) in &element.attributes {
                    start.push_attribute((key.as_bytes(), value.as_bytes()));
                }

                if element.children.is_empty() && element.self_closing {
                    writer.write_event(Event::Empty(start))?;
                } else {
                    writer.write_event(Event::Start(start))?;
                    for child in &element.children {
                        Self::write_node(writer, child)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
                }
            }
            Node::Text(text) => {
                writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
            }
            Node::RawText(text) => writer.get_mut().write_all(text.as_bytes())?,
            Node::Comment(comment) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?;
            }
            Node::CData(data) => {
                writer.write_event(Event::CData(BytesCData::new(data.as_str())))?;
            }
            Node::Reference(entity) => write!(writer.get_mut(), "&{};", entity)?,
            Node::Instruction(instruction) => write!(writer.get_mut(), "<?{}?>", instruction)?,
            Node::DocType(doctype) => write!(writer.get_mut(), "<!DOCTYPE {}>", doctype)?,
        }

        Ok(())
    }
}

/// Attach a finished node to the innermost open element, or to the document root
fn append_node(stack: &mut [Element], document: &mut Document, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => document.children.push(node),
    }
}

/// Append text, merging with a directly preceding text node
fn push_text(stack: &mut [Element], document: &mut Document, text: &str) {
    if text.is_empty() {
        return;
    }

    let siblings = match stack.last_mut() {
        Some(parent) => &mut parent.children,
        None => &mut document.children,
    };

    match siblings.last_mut() {
        Some(Node::Text(previous)) => previous.push_str(text),
        _ => siblings.push(Node::text(text)),
    }
}

/// Resolve the body of an entity reference (`amp`, `eacute`, `#8217`, `#x263A`)
///
/// Named entities are looked up in the predefined XML set first and then in the
/// HTML5 set. Returns `None` for unknown names and invalid code points.
pub fn resolve_entity(entity: &str) -> Option<String> {
    if let Some(number) = entity.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    resolve_xml_entity(entity)
        .or_else(|| resolve_html5_entity(entity))
        .map(str::to_string)
}

/// Pop every element from `position` upwards, attaching each to its parent
fn close_to(stack: &mut Vec<Element>, document: &mut Document, position: usize) {
    while stack.len() > position {
        if let Some(element) = stack.pop() {
            append_node(stack, document, Node::Element(element));
        }
    }
}

/// Close the elements whose end tag HTML lets authors omit
///
/// A new `<li>` closes the open `<li>` of the same list, `<dt>`/`<dd>` close each
/// other, and a `<p>` or block element closes an open `<p>`. The search stops at
/// the first element that bounds the scope, so nested lists and table cells keep
/// their content.
fn close_implied(stack: &mut Vec<Element>, document: &mut Document, starting: &str) {
    let (closes, boundaries): (&[&str], &[&str]) = match starting {
        "li" => (&["li"], &["ul", "ol", "menu"]),
        "dt" | "dd" => (&["dt", "dd"], &["dl"]),
        _ if CLOSES_PARAGRAPH.contains(&starting) => (&["p"], &PARAGRAPH_BOUNDARIES),
        _ => return,
    };

    let mut position = None;
    for (index, open) in stack.iter().enumerate().rev() {
        if closes.iter().any(|name| open.is(name)) {
            position = Some(index);
            break;
        }
        if boundaries.iter().any(|name| open.is(name)) {
            break;
        }
    }

    if let Some(position) = position {
        close_to(stack, document, position);
    }
}

/// Find the end tag of a raw text element, ignoring ASCII case
///
/// ## Return
/// The offset where the body ends and the offset just past the end tag, both
/// relative to `rest`; `None` when the element is never closed.
fn find_raw_text_end(rest: &[u8], name: &str) -> Option<(usize, usize)> {
    let name = name.as_bytes();
    let mut from = 0;

    while let Some(found) = rest[from..].windows(2).position(|pair| pair == b"</") {
        let start = from + found;
        let tag = &rest[start + 2..];
        let closes = tag.len() >= name.len()
            && tag[..name.len()].eq_ignore_ascii_case(name)
            && tag
                .get(name.len())
                .is_none_or(|next| next.is_ascii_whitespace() || matches!(*next, b'>' | b'/'));

        if closes {
            let close_end = rest[start..]
                .iter()
                .position(|byte| *byte == b'>')
                .map_or(rest.len(), |offset| start + offset + 1);
            return Some((start, close_end));
        }
        from = start + 2;
    }

    None
}
