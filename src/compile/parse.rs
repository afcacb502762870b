use std::collections::BTreeMap;
use std::fmt::Display;

use crate::compile::lex::{Lexer, Token};
use crate::compile::Whitespace;
use crate::types::ast;
use crate::types::span::Span;
use crate::{Error, Result};

/// A parser that constructs an AST from a token stream.
///
/// The parser is a hand written parser that keeps open sections on an
/// explicit stack instead of recursing. It sometimes needs to peek at the next
/// token to know how to proceed and uses the `peeked` buffer to do this.
pub struct Parser<'source> {
    /// A lexer that tokenizes the template source.
    tokens: Lexer<'source>,

    /// Remember a peeked value, even if it was `None`
    peeked: Option<Option<(Token, Span)>>,

    /// How to treat whitespace in raw template.
    whitespace: Whitespace,

    /// Inline partials collected while parsing.
    blocks: BTreeMap<String, ast::Body>,
}

/// Stores the state of an open tag during parsing.
enum State {
    /// A section or helper, e.g. `{#items}` or `{@eq key=a value=b}`.
    Section {
        open: Open,
        /// The key as written, used to match the close tag.
        name: String,
        /// The span of the open tag.
        span: Span,
        /// The primary body, set once the first `{:name}` is seen.
        primary: Option<ast::Body>,
        /// Named bodies, e.g. `{:else}`.
        bodies: BTreeMap<String, ast::Body>,
        /// The name of the body currently being parsed.
        current: Option<String>,
    },

    /// A block `{+name}` or inline partial `{<name}`.
    Block {
        name: ast::Ident,
        define: bool,
    },
}

enum Open {
    Section(ast::SectionKind, ast::Path, Vec<ast::Param>),
    Helper(ast::Ident, Vec<ast::Param>),
}

impl<'source> Parser<'source> {
    /// Construct a new parser.
    pub fn new(source: &'source str, whitespace: Whitespace) -> Self {
        Self {
            tokens: Lexer::new(source),
            peeked: None,
            whitespace,
            blocks: BTreeMap::new(),
        }
    }

    /// Parses a template, returning the body and the inline partials.
    pub fn parse_template(mut self) -> Result<(ast::Body, BTreeMap<String, ast::Body>)> {
        let body = self.parse_body()?;
        Ok((body, self.blocks))
    }

    /// Parses a body.
    ///
    /// This function works using two stacks:
    /// - A stack of open tags e.g. `{#items} ... {:else}`.
    /// - A stack of bodies which collect each parsed part.
    fn parse_body(&mut self) -> Result<ast::Body> {
        let mut states: Vec<State> = vec![];
        let mut scopes = vec![ast::Body::new()];

        while let Some(next) = self.next()? {
            let part = match next {
                // Simply raw template, emit a single part for it.
                (Token::Raw, span) => ast::Part::Text(self.text(span)),

                // A comment, e.g. `{! ... !}`
                (Token::Comment, span) => {
                    ast::Part::Comment(self.source()[span.inner(2, 2)].to_owned())
                }

                // Raw text, e.g. ``{`{not a tag}`}``
                (Token::RawText, span) => {
                    ast::Part::Text(self.source()[span.inner(2, 2)].to_owned())
                }

                // A special character, e.g. `{~n}`
                (Token::Special, span) => {
                    let special = match &self.source()[span.inner(2, 1)] {
                        "n" => "\n",
                        "r" => "\r",
                        "s" => " ",
                        "lb" => "{",
                        "rb" => "}",
                        _ => {
                            return Err(Error::syntax(
                                "unknown special character",
                                self.source(),
                                span,
                            ))
                        }
                    };
                    ast::Part::Text(special.to_owned())
                }

                // A reference, e.g. `{user.name|h}`
                (Token::BeginReference, begin) => {
                    let path = self.parse_path()?;
                    let filters = self.parse_filters()?;
                    let end = self.expect(Token::End)?;
                    ast::Part::Reference(ast::Reference {
                        path,
                        filters,
                        span: begin.combine(end),
                    })
                }

                // The start of a section or helper, e.g. `{#items}`, `{?items}`,
                // `{^items}` or `{@sep}`.
                (
                    tk @ (Token::BeginSection
                    | Token::BeginExists
                    | Token::BeginNotExists
                    | Token::BeginHelper),
                    begin,
                ) => {
                    let (open, name) = match tk {
                        Token::BeginHelper => {
                            let ident = self.parse_ident()?;
                            let name = ident.name.clone();
                            let params = self.parse_params()?;
                            (Open::Helper(ident, params), name)
                        }
                        _ => {
                            let kind = match tk {
                                Token::BeginExists => ast::SectionKind::Exists,
                                Token::BeginNotExists => ast::SectionKind::NotExists,
                                _ => ast::SectionKind::Section,
                            };
                            let key = self.parse_path()?;
                            let name = self.source()[key.span].to_owned();
                            let params = self.parse_params()?;
                            (Open::Section(kind, key, params), name)
                        }
                    };
                    let (self_closing, end) = self.parse_tag_end()?;
                    let span = begin.combine(end);
                    if self_closing {
                        open.into_part(span, None, BTreeMap::new())
                    } else {
                        states.push(State::Section {
                            open,
                            name,
                            span,
                            primary: None,
                            bodies: BTreeMap::new(),
                            current: None,
                        });
                        scopes.push(ast::Body::new());
                        continue;
                    }
                }

                // A block, e.g. `{+title}default{/title}` or `{+title/}`
                (Token::BeginInsert, _) => {
                    let name = self.parse_ident()?;
                    let (self_closing, _) = self.parse_tag_end()?;
                    if self_closing {
                        ast::Part::Block(ast::Block { name, body: None })
                    } else {
                        states.push(State::Block {
                            name,
                            define: false,
                        });
                        scopes.push(ast::Body::new());
                        continue;
                    }
                }

                // An inline partial, e.g. `{<title}Home{/title}`
                (Token::BeginDefine, _) => {
                    let name = self.parse_ident()?;
                    let (self_closing, _) = self.parse_tag_end()?;
                    if self_closing {
                        self.blocks.insert(name.name, ast::Body::new());
                    } else {
                        states.push(State::Block { name, define: true });
                        scopes.push(ast::Body::new());
                    }
                    continue;
                }

                // A partial, e.g. `{>header:page title="Home"/}`
                (Token::BeginPartial, begin) => {
                    let name = match self.next()? {
                        Some((Token::Name, span)) => {
                            ast::PartialName::Static(self.source()[span].to_owned())
                        }
                        Some((Token::String, span)) => {
                            let body = self.parse_string(span)?;
                            match body.as_text() {
                                Some(text) => ast::PartialName::Static(text.to_owned()),
                                None => ast::PartialName::Dynamic(body),
                            }
                        }
                        Some((tk, span)) => {
                            return Err(self.err_unexpected_token("partial name", tk, span))
                        }
                        None => return Err(self.err_unexpected_eof("partial name")),
                    };
                    let context = match self.is_next(Token::Colon)? {
                        true => {
                            self.expect(Token::Colon)?;
                            Some(self.parse_path()?)
                        }
                        false => None,
                    };
                    let params = self.parse_params()?;
                    let end = match self.next()? {
                        Some((Token::SelfClose, span)) => span,
                        Some((tk, span)) => {
                            return Err(self.err_unexpected_token("self closing end tag", tk, span))
                        }
                        None => return Err(self.err_unexpected_eof("self closing end tag")),
                    };
                    ast::Part::Partial(ast::Partial {
                        name,
                        context,
                        params,
                        span: begin.combine(end),
                    })
                }

                // A named body, e.g. `{:else}`
                (Token::BeginBody, begin) => {
                    let ident = self.parse_ident()?;
                    let end = self.expect(Token::End)?;
                    let span = begin.combine(end);
                    let err = || {
                        Error::syntax(
                            format!("unexpected `{{:{}}}` outside of a section", ident.name),
                            self.source(),
                            span,
                        )
                    };
                    match states.last_mut() {
                        Some(State::Section {
                            primary,
                            bodies,
                            current,
                            ..
                        }) => {
                            let body = scopes.pop().ok_or_else(err)?;
                            match current.take() {
                                None => *primary = Some(body),
                                Some(name) => {
                                    bodies.insert(name, body);
                                }
                            }
                            *current = Some(ident.name);
                            scopes.push(ast::Body::new());
                        }
                        _ => return Err(err()),
                    }
                    continue;
                }

                // A close tag, e.g. `{/items}`
                (Token::BeginClose, begin) => {
                    let key = self.parse_close_key()?;
                    let end = self.expect(Token::End)?;
                    let span = begin.combine(end);
                    let (state, body) = match (states.pop(), scopes.pop()) {
                        (Some(state), Some(body)) => (state, body),
                        _ => {
                            return Err(Error::syntax(
                                format!("unexpected close tag `{{/{key}}}`"),
                                self.source(),
                                span,
                            ))
                        }
                    };
                    match state {
                        State::Section {
                            open,
                            name,
                            span: open_span,
                            primary,
                            mut bodies,
                            current,
                        } => {
                            if name != key {
                                return Err(self.err_mismatched(&name, &key, span));
                            }
                            let primary = match current {
                                None => body,
                                Some(current) => {
                                    bodies.insert(current, body);
                                    primary.unwrap_or_default()
                                }
                            };
                            open.into_part(open_span.combine(span), Some(primary), bodies)
                        }
                        State::Block { name, define } => {
                            if name.name != key {
                                return Err(self.err_mismatched(&name.name, &key, span));
                            }
                            if define {
                                self.blocks.insert(name.name, body);
                                continue;
                            }
                            ast::Part::Block(ast::Block {
                                name,
                                body: Some(body),
                            })
                        }
                    }
                }

                (tk, span) => {
                    return Err(Error::syntax(
                        format!("unexpected {}", tk.human()),
                        self.source(),
                        span,
                    ));
                }
            };
            if let Some(scope) = scopes.last_mut() {
                scope.push(part);
            }
        }

        if let Some(state) = states.first() {
            let (msg, span) = match state {
                State::Section { name, span, .. } => (format!("unclosed section `{name}`"), *span),
                State::Block { name, .. } => (format!("unclosed block `{}`", name.name), name.span),
            };
            return Err(Error::syntax(msg, self.source(), span));
        }

        Ok(scopes.pop().unwrap_or_default())
    }

    /// Parses a path. All of the following are valid paths.
    ///
    ///   name
    ///
    ///   user.address.city
    ///
    ///   .
    ///
    ///   .name
    ///
    ///   items[0].name
    ///
    ///   lookup[keys.current]
    ///
    fn parse_path(&mut self) -> Result<ast::Path> {
        let (anchor, mut keys, mut span) = match self.next()? {
            Some((Token::Dot, span)) => match self.peek()? {
                Some((Token::Ident, key)) if key.m == span.n => {
                    self.next()?;
                    let name = self.source()[key].to_owned();
                    (ast::Anchor::Current, vec![ast::Key::Name(name)], span.combine(key))
                }
                _ => (ast::Anchor::Current, vec![], span),
            },
            Some((Token::Ident, span)) => {
                let name = self.source()[span].to_owned();
                (ast::Anchor::Relative, vec![ast::Key::Name(name)], span)
            }
            Some((tk, span)) => return Err(self.err_unexpected_token("path", tk, span)),
            None => return Err(self.err_unexpected_eof("path")),
        };

        loop {
            match self.peek()? {
                Some((Token::Dot, dot)) if dot.m == span.n => {
                    self.next()?;
                    let (key, sp) = match self.next()? {
                        Some((Token::Ident, sp)) => {
                            (ast::Key::Name(self.source()[sp].to_owned()), sp)
                        }
                        Some((Token::Number, sp)) => (self.parse_index(sp)?, sp),
                        Some((tk, sp)) => return Err(self.err_unexpected_token("key", tk, sp)),
                        None => return Err(self.err_unexpected_eof("key")),
                    };
                    keys.push(key);
                    span = span.combine(sp);
                }
                Some((Token::OpenBracket, open)) if open.m == span.n => {
                    self.next()?;
                    let key = match self.peek()? {
                        Some((Token::Number, sp)) => {
                            self.next()?;
                            self.parse_index(sp)?
                        }
                        _ => ast::Key::Expr(self.parse_path()?),
                    };
                    let close = self.expect(Token::CloseBracket)?;
                    keys.push(key);
                    span = span.combine(close);
                }
                _ => break,
            }
        }

        Ok(ast::Path { anchor, keys, span })
    }

    fn parse_index(&self, span: Span) -> Result<ast::Key> {
        self.source()[span]
            .parse()
            .map(ast::Key::Index)
            .map_err(|_| Error::syntax("invalid index", self.source(), span))
    }

    /// Parses a filter chain, e.g. `|s|js`.
    fn parse_filters(&mut self) -> Result<Vec<ast::Ident>> {
        let mut filters = Vec::new();
        while self.is_next(Token::Pipe)? {
            self.expect(Token::Pipe)?;
            filters.push(self.parse_ident()?);
        }
        Ok(filters)
    }

    /// Parses a whitespace separated list of parameters, e.g.
    /// `key=name value="Jane" limit=3`.
    fn parse_params(&mut self) -> Result<Vec<ast::Param>> {
        let mut params = Vec::new();
        while self.is_next(Token::Ident)? {
            let name = self.parse_ident()?;
            self.expect(Token::Equals)?;
            let value = match self.next()? {
                Some((Token::String, span)) => {
                    let body = self.parse_string(span)?;
                    match body.as_text() {
                        Some(text) => {
                            ast::ParamValue::Literal(ast::Literal::String(text.to_owned()))
                        }
                        None => ast::ParamValue::Interpolated(body),
                    }
                }
                Some((Token::Number, span)) => self.parse_number(span)?,
                Some((tk @ (Token::Ident | Token::Dot), span)) => {
                    // Put the token back, the path parser wants it.
                    self.peeked = Some(Some((tk, span)));
                    ast::ParamValue::Path(self.parse_path()?)
                }
                Some((tk, span)) => {
                    return Err(self.err_unexpected_token("parameter value", tk, span))
                }
                None => return Err(self.err_unexpected_eof("parameter value")),
            };
            params.push(ast::Param { name, value });
        }
        Ok(params)
    }

    /// Parses a quoted string. Strings may contain tags, e.g.
    /// `"{first} {last}"`, so the inside is parsed as a body.
    fn parse_string(&mut self, span: Span) -> Result<ast::Body> {
        let inner = span.inner(1, 1);
        let raw = &self.source()[inner];
        let mut body = ast::Body::new();
        if !raw.contains('{') {
            body.push(ast::Part::Text(unescape(raw)));
            return Ok(body);
        }
        let mut parser = Parser {
            tokens: Lexer::with_range(self.source(), inner.m, inner.n),
            peeked: None,
            whitespace: Whitespace::Preserve,
            blocks: BTreeMap::new(),
        };
        for part in parser.parse_body()?.parts {
            match part {
                ast::Part::Text(text) => body.push(ast::Part::Text(unescape(&text))),
                part => body.push(part),
            }
        }
        Ok(body)
    }

    fn parse_number(&self, span: Span) -> Result<ast::ParamValue> {
        let raw = &self.source()[span];
        let lit = match raw.parse::<i64>() {
            Ok(n) => ast::Literal::Integer(n),
            Err(_) => raw
                .parse::<f64>()
                .map(ast::Literal::Float)
                .map_err(|_| Error::syntax("invalid number", self.source(), span))?,
        };
        Ok(ast::ParamValue::Literal(lit))
    }

    /// Parses the key of a close tag and returns it as written.
    fn parse_close_key(&mut self) -> Result<String> {
        let mut span: Option<Span> = None;
        while let Some((tk, sp)) = self.peek()? {
            if tk == Token::End {
                break;
            }
            self.next()?;
            span = Some(span.map_or(sp, |s| s.combine(sp)));
        }
        match span {
            Some(span) => Ok(self.source()[span].to_owned()),
            None => Err(self.err_unexpected_eof("close tag key")),
        }
    }

    /// Parses the end of a tag, returning whether it was self closing.
    fn parse_tag_end(&mut self) -> Result<(bool, Span)> {
        match self.next()? {
            Some((Token::End, span)) => Ok((false, span)),
            Some((Token::SelfClose, span)) => Ok((true, span)),
            Some((tk, span)) => Err(self.err_unexpected_token("end tag", tk, span)),
            None => Err(self.err_unexpected_eof("end tag")),
        }
    }

    /// Parses an identifier.
    fn parse_ident(&mut self) -> Result<ast::Ident> {
        let span = self.expect(Token::Ident)?;
        Ok(ast::Ident {
            name: self.source()[span].to_owned(),
            span,
        })
    }

    /// Returns raw template text, compressing whitespace if configured.
    fn text(&self, span: Span) -> String {
        let raw = &self.source()[span];
        match self.whitespace {
            Whitespace::Preserve => raw.to_owned(),
            Whitespace::Compress => compress(raw),
        }
    }

    /// Expects the next token to be the given token.
    fn expect(&mut self, exp: Token) -> Result<Span> {
        match self.next()? {
            Some((tk, span)) if tk == exp => Ok(span),
            Some((tk, span)) => Err(self.err_unexpected_token(exp.human(), tk, span)),
            None => Err(self.err_unexpected_eof(exp.human())),
        }
    }

    /// Returns `true` if the next token is equal to the provided one.
    fn is_next(&mut self, token: Token) -> Result<bool> {
        Ok(self.peek()?.map(|(tk, _)| tk == token).unwrap_or(false))
    }

    /// Returns a copy of the next token without affecting the result of the
    /// following `.next()` call.
    fn peek(&mut self) -> Result<Option<(Token, Span)>> {
        if let o @ None = &mut self.peeked {
            *o = Some(self.tokens.next()?);
        }
        Ok(self.peeked.flatten())
    }

    /// Returns the next token and span in the stream.
    fn next(&mut self) -> Result<Option<(Token, Span)>> {
        match self.peeked.take() {
            Some(v) => Ok(v),
            None => self.tokens.next(),
        }
    }

    fn source(&self) -> &'source str {
        self.tokens.source
    }

    fn err_unexpected_eof(&self, exp: impl Display) -> Error {
        let n = self.source().len();
        Error::syntax(format!("expected {exp}, found EOF"), self.source(), n..n)
    }

    fn err_unexpected_token(&self, exp: impl Display, got: Token, span: Span) -> Error {
        let got = got.human();
        Error::syntax(format!("expected {exp}, found {got}"), self.source(), span)
    }

    fn err_mismatched(&self, open: &str, close: &str, span: Span) -> Error {
        Error::syntax(
            format!("mismatched close tag `{{/{close}}}`, expected `{{/{open}}}`"),
            self.source(),
            span,
        )
    }
}

impl Open {
    fn into_part(
        self,
        span: Span,
        body: Option<ast::Body>,
        bodies: BTreeMap<String, ast::Body>,
    ) -> ast::Part {
        match self {
            Open::Section(kind, key, params) => ast::Part::Section(ast::Section {
                kind,
                key,
                params,
                body,
                bodies,
                span,
            }),
            Open::Helper(name, params) => ast::Part::Helper(ast::HelperCall {
                name,
                params,
                body,
                bodies,
                span,
            }),
        }
    }
}

/// Removes newlines together with the indentation that follows them.
fn compress(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                while matches!(chars.peek(), Some(' ' | '\t')) {
                    chars.next();
                }
            }
            c => out.push(c),
        }
    }
    out
}

fn unescape(raw: &str) -> String {
    raw.replace("\\\"", "\"")
}
