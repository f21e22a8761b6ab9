use crate::error::{ParseError, ParseResult};
use logos::Logos;
use std::ops::Range;

/// Lexer mode for character data between tags.
///
/// Whitespace is significant here: text runs are captured verbatim so the
/// tree can round-trip the source byte-exactly.
#[derive(Logos, Debug, Clone, PartialEq)]
enum ContentToken {
    #[token("<!--")]
    CommentOpen,

    #[token("<![CDATA[")]
    CdataOpen,

    #[token("<?")]
    PiOpen,

    #[token("</")]
    EndTagOpen,

    #[token("<")]
    TagOpen,

    #[regex(r"[^<]+")]
    Text,
}

/// Lexer mode inside a tag, entered after `<` or `</`.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum MarkupToken<'src> {
    #[regex(r"[A-Za-z_][A-Za-z0-9._:\-]*", |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Eq,

    #[regex(r#""[^"]*""#, |lex| lex.slice())]
    DoubleQuoted(&'src str),

    #[regex(r"'[^']*'", |lex| lex.slice())]
    SingleQuoted(&'src str),

    #[token(">")]
    TagClose,

    #[token("/>")]
    SelfClose,
}

/// Flat token stream handed to the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    TagOpen,
    EndTagOpen,
    TagClose,
    SelfClose,
    Name(&'src str),
    Eq,
    /// Attribute value including its surrounding quotes.
    Quoted(&'src str),
    /// Character data run, verbatim.
    Text(&'src str),
    /// Comment body, without the `<!--`/`-->` delimiters.
    Comment(&'src str),
    /// CDATA body, without the delimiters.
    Cdata(&'src str),
    ProcessingInstruction {
        target: &'src str,
        data: &'src str,
    },
}

pub type Spanned<'src> = (Token<'src>, Range<usize>);

/// Tokenize a whole source text, switching lexer modes at tag boundaries.
pub fn tokenize(source: &str) -> ParseResult<Vec<Spanned<'_>>> {
    let mut out = Vec::new();
    let mut content = ContentToken::lexer(source);

    while let Some(tok) = content.next() {
        let span = content.span();
        match tok {
            Err(()) => return Err(ParseError::lexer_error(span.start)),

            Ok(ContentToken::Text) => {
                out.push((Token::Text(&source[span.clone()]), span));
            }

            Ok(ContentToken::CommentOpen) => {
                let rest = content.remainder();
                let Some(end) = rest.find("-->") else {
                    return Err(ParseError::unterminated(span.start, "comment"));
                };
                out.push((Token::Comment(&rest[..end]), span.start..span.end + end + 3));
                content.bump(end + 3);
            }

            Ok(ContentToken::CdataOpen) => {
                let rest = content.remainder();
                let Some(end) = rest.find("]]>") else {
                    return Err(ParseError::unterminated(span.start, "CDATA section"));
                };
                out.push((Token::Cdata(&rest[..end]), span.start..span.end + end + 3));
                content.bump(end + 3);
            }

            Ok(ContentToken::PiOpen) => {
                let rest = content.remainder();
                let Some(end) = rest.find("?>") else {
                    return Err(ParseError::unterminated(span.start, "processing instruction"));
                };
                let inner = &rest[..end];
                let target_end = inner
                    .find(|c: char| c.is_whitespace())
                    .unwrap_or(inner.len());
                let token = Token::ProcessingInstruction {
                    target: &inner[..target_end],
                    data: inner[target_end..].trim_start(),
                };
                out.push((token, span.start..span.end + end + 2));
                content.bump(end + 2);
            }

            Ok(ContentToken::TagOpen) | Ok(ContentToken::EndTagOpen) => {
                let open = if matches!(tok, Ok(ContentToken::TagOpen)) {
                    Token::TagOpen
                } else {
                    Token::EndTagOpen
                };
                out.push((open, span));

                let mut markup = content.morph::<MarkupToken>();
                loop {
                    let Some(mt) = markup.next() else {
                        return Err(ParseError::unexpected_eof(markup.span().start));
                    };
                    let mspan = markup.span();
                    match mt {
                        Err(()) => return Err(ParseError::lexer_error(mspan.start)),
                        Ok(MarkupToken::Name(name)) => out.push((Token::Name(name), mspan)),
                        Ok(MarkupToken::Eq) => out.push((Token::Eq, mspan)),
                        Ok(MarkupToken::DoubleQuoted(raw)) | Ok(MarkupToken::SingleQuoted(raw)) => {
                            out.push((Token::Quoted(raw), mspan));
                        }
                        Ok(MarkupToken::TagClose) => {
                            out.push((Token::TagClose, mspan));
                            break;
                        }
                        Ok(MarkupToken::SelfClose) => {
                            out.push((Token::SelfClose, mspan));
                            break;
                        }
                    }
                }
                content = markup.morph();
            }
        }
    }

    Ok(out)
}
