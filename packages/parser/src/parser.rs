use crate::ast::{Attribute, QName, XmlNode};
use crate::error::{ParseError, ParseResult};
use crate::id_generator::IdGenerator;
use crate::tokenizer::{tokenize, Spanned, Token};
use std::sync::Arc;

/// Recursive-descent parser over the token stream.
///
/// Node ids are drawn from the caller's generator so that every tree a
/// model ever sees shares one monotonic id space.
pub struct Parser<'src> {
    tokens: Vec<Spanned<'src>>,
    pos: usize,
    source_len: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            source_len: source.len(),
        })
    }

    /// Parse a complete document: optional misc nodes around exactly one
    /// root element.
    pub fn parse_document(&mut self, ids: &mut IdGenerator) -> ParseResult<Arc<XmlNode>> {
        let id = ids.next_id();
        let mut children = Vec::new();
        let mut has_root = false;

        while let Some((token, span)) = self.peek() {
            let start = span.start;
            match token {
                Token::Text(raw) => {
                    if !raw.chars().all(char::is_whitespace) {
                        return Err(ParseError::invalid_syntax(
                            start,
                            "character data outside the root element",
                        ));
                    }
                    let raw = raw.to_string();
                    self.advance();
                    children.push(Arc::new(XmlNode::Text {
                        id: ids.next_id(),
                        raw,
                        cdata: false,
                    }));
                }
                Token::Comment(text) => {
                    let text = text.to_string();
                    self.advance();
                    children.push(Arc::new(XmlNode::Comment {
                        id: ids.next_id(),
                        text,
                    }));
                }
                Token::ProcessingInstruction { target, data } => {
                    let (target, data) = (target.to_string(), data.to_string());
                    self.advance();
                    children.push(Arc::new(XmlNode::ProcessingInstruction {
                        id: ids.next_id(),
                        target,
                        data,
                    }));
                }
                Token::TagOpen => {
                    if has_root {
                        return Err(ParseError::invalid_syntax(
                            start,
                            "more than one root element",
                        ));
                    }
                    has_root = true;
                    children.push(self.parse_element(ids)?);
                }
                other => {
                    return Err(ParseError::unexpected_token(
                        start,
                        "root element or misc content",
                        format!("{other:?}"),
                    ));
                }
            }
        }

        if !has_root {
            return Err(ParseError::invalid_syntax(
                self.source_len,
                "missing root element",
            ));
        }

        Ok(Arc::new(XmlNode::Document { id, children }))
    }

    /// Parse a fragment: any sequence of elements, text, and misc nodes.
    pub fn parse_fragment(&mut self, ids: &mut IdGenerator) -> ParseResult<Vec<Arc<XmlNode>>> {
        let mut nodes = Vec::new();
        while let Some((token, span)) = self.peek() {
            let start = span.start;
            match token {
                Token::TagOpen => nodes.push(self.parse_element(ids)?),
                Token::Text(raw) => {
                    let raw = raw.to_string();
                    self.advance();
                    nodes.push(Arc::new(XmlNode::Text {
                        id: ids.next_id(),
                        raw,
                        cdata: false,
                    }));
                }
                Token::Cdata(raw) => {
                    let raw = raw.to_string();
                    self.advance();
                    nodes.push(Arc::new(XmlNode::Text {
                        id: ids.next_id(),
                        raw,
                        cdata: true,
                    }));
                }
                Token::Comment(text) => {
                    let text = text.to_string();
                    self.advance();
                    nodes.push(Arc::new(XmlNode::Comment {
                        id: ids.next_id(),
                        text,
                    }));
                }
                Token::ProcessingInstruction { target, data } => {
                    let (target, data) = (target.to_string(), data.to_string());
                    self.advance();
                    nodes.push(Arc::new(XmlNode::ProcessingInstruction {
                        id: ids.next_id(),
                        target,
                        data,
                    }));
                }
                other => {
                    return Err(ParseError::unexpected_token(
                        start,
                        "fragment content",
                        format!("{other:?}"),
                    ));
                }
            }
        }
        Ok(nodes)
    }

    fn parse_element(&mut self, ids: &mut IdGenerator) -> ParseResult<Arc<XmlNode>> {
        self.expect_tag_open()?;
        let name = QName::parse(self.expect_name()?);
        let id = ids.next_id();

        let mut attributes = Vec::new();
        while let Some((Token::Name(_), _)) = self.peek() {
            attributes.push(self.parse_attribute(ids)?);
        }

        match self.next() {
            Some((Token::SelfClose, _)) => Ok(Arc::new(XmlNode::Element {
                id,
                name,
                attributes,
                children: Vec::new(),
                self_closing: true,
            })),
            Some((Token::TagClose, _)) => {
                let children = self.parse_children(ids, &name)?;
                Ok(Arc::new(XmlNode::Element {
                    id,
                    name,
                    attributes,
                    children,
                    self_closing: false,
                }))
            }
            Some((other, span)) => Err(ParseError::unexpected_token(
                span.start,
                "'>' or '/>'",
                format!("{other:?}"),
            )),
            None => Err(ParseError::unexpected_eof(self.source_len)),
        }
    }

    fn parse_attribute(&mut self, ids: &mut IdGenerator) -> ParseResult<Attribute> {
        let name = QName::parse(self.expect_name()?);
        self.expect_eq()?;
        let quoted = self.expect_quoted()?;
        // Strip the surrounding quotes, keep the raw value.
        let value = &quoted[1..quoted.len() - 1];
        Ok(Attribute::new(ids.next_id(), name, value))
    }

    fn parse_children(
        &mut self,
        ids: &mut IdGenerator,
        parent: &QName,
    ) -> ParseResult<Vec<Arc<XmlNode>>> {
        let mut children = Vec::new();
        loop {
            match self.peek() {
                Some((Token::TagOpen, _)) => children.push(self.parse_element(ids)?),
                Some((Token::Text(raw), _)) => {
                    let raw = raw.to_string();
                    self.advance();
                    children.push(Arc::new(XmlNode::Text {
                        id: ids.next_id(),
                        raw,
                        cdata: false,
                    }));
                }
                Some((Token::Cdata(raw), _)) => {
                    let raw = raw.to_string();
                    self.advance();
                    children.push(Arc::new(XmlNode::Text {
                        id: ids.next_id(),
                        raw,
                        cdata: true,
                    }));
                }
                Some((Token::Comment(text), _)) => {
                    let text = text.to_string();
                    self.advance();
                    children.push(Arc::new(XmlNode::Comment {
                        id: ids.next_id(),
                        text,
                    }));
                }
                Some((Token::ProcessingInstruction { target, data }, _)) => {
                    let (target, data) = (target.to_string(), data.to_string());
                    self.advance();
                    children.push(Arc::new(XmlNode::ProcessingInstruction {
                        id: ids.next_id(),
                        target,
                        data,
                    }));
                }
                Some((Token::EndTagOpen, span)) => {
                    let start = span.start;
                    self.advance();
                    let closing = self.expect_name()?;
                    if QName::parse(closing) != *parent {
                        return Err(ParseError::MismatchedTag {
                            pos: start,
                            expected: parent.to_string(),
                            found: closing.to_string(),
                        });
                    }
                    self.expect_tag_close()?;
                    return Ok(children);
                }
                Some((other, span)) => {
                    return Err(ParseError::unexpected_token(
                        span.start,
                        "child content or closing tag",
                        format!("{other:?}"),
                    ));
                }
                None => return Err(ParseError::unexpected_eof(self.source_len)),
            }
        }
    }

    fn peek(&self) -> Option<&Spanned<'src>> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Spanned<'src>> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect_tag_open(&mut self) -> ParseResult<()> {
        match self.next() {
            Some((Token::TagOpen, _)) => Ok(()),
            Some((other, span)) => Err(ParseError::unexpected_token(
                span.start,
                "'<'",
                format!("{other:?}"),
            )),
            None => Err(ParseError::unexpected_eof(self.source_len)),
        }
    }

    fn expect_tag_close(&mut self) -> ParseResult<()> {
        match self.next() {
            Some((Token::TagClose, _)) => Ok(()),
            Some((other, span)) => Err(ParseError::unexpected_token(
                span.start,
                "'>'",
                format!("{other:?}"),
            )),
            None => Err(ParseError::unexpected_eof(self.source_len)),
        }
    }

    fn expect_name(&mut self) -> ParseResult<&'src str> {
        match self.next() {
            Some((Token::Name(name), _)) => Ok(name),
            Some((other, span)) => Err(ParseError::unexpected_token(
                span.start,
                "name",
                format!("{other:?}"),
            )),
            None => Err(ParseError::unexpected_eof(self.source_len)),
        }
    }

    fn expect_eq(&mut self) -> ParseResult<()> {
        match self.next() {
            Some((Token::Eq, _)) => Ok(()),
            Some((other, span)) => Err(ParseError::unexpected_token(
                span.start,
                "'='",
                format!("{other:?}"),
            )),
            None => Err(ParseError::unexpected_eof(self.source_len)),
        }
    }

    fn expect_quoted(&mut self) -> ParseResult<&'src str> {
        match self.next() {
            Some((Token::Quoted(raw), _)) => Ok(raw),
            Some((other, span)) => Err(ParseError::unexpected_token(
                span.start,
                "quoted value",
                format!("{other:?}"),
            )),
            None => Err(ParseError::unexpected_eof(self.source_len)),
        }
    }
}

/// Parse a complete document.
pub fn parse(source: &str, ids: &mut IdGenerator) -> ParseResult<Arc<XmlNode>> {
    Parser::new(source)?.parse_document(ids)
}

/// Parse a content fragment: zero or more sibling nodes, no single-root
/// requirement. Used by raw-content replacement.
pub fn parse_fragment(source: &str, ids: &mut IdGenerator) -> ParseResult<Vec<Arc<XmlNode>>> {
    Parser::new(source)?.parse_fragment(ids)
}
