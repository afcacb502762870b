use crate::types::span::Span;
use crate::{Error, Result};

/// A lexer that tokenizes the template source into distinct chunks so that the
/// parser doesn't have to operate on raw text.
///
/// The lexer is implemented as a fallible iterator. The parser should
/// repeatedly call the [`.next()?`][Lexer::next] method to return the next
/// non-whitespace token until [`None`] is returned.
pub struct Lexer<'source> {
    /// The original template source.
    pub source: &'source str,

    /// A cursor over the template source.
    cursor: usize,

    /// Where to stop lexing, used when lexing the inside of a quoted
    /// parameter.
    end: usize,

    /// The current state of the lexer.
    state: State,

    /// A buffer to store the next token.
    next: Option<(Token, Span)>,
}

/// The state of the lexer.
///
/// Tokenization differs between raw template text and the inside of a tag,
/// e.g. `{#items}`. Partial names are unquoted paths like `shared/header`
/// which need their own state.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Within raw template.
    Template,

    /// Between `{` and `}`.
    Tag {
        /// The span of the begin tag.
        begin: Span,
    },

    /// Directly after `{>`.
    PartialName {
        /// The span of the begin tag.
        begin: Span,
    },
}

/// The unit yielded by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Raw template
    Raw,
    /// A comment, e.g. `{! ... !}`
    Comment,
    /// Raw text that is never parsed, e.g. ``{`{not a tag}`}``
    RawText,
    /// A special character, e.g. `{~n}`
    Special,
    /// Begin reference tag `{`
    BeginReference,
    /// Begin section tag `{#`
    BeginSection,
    /// Begin exists tag `{?`
    BeginExists,
    /// Begin not exists tag `{^`
    BeginNotExists,
    /// Begin helper tag `{@`
    BeginHelper,
    /// Begin inline partial tag `{<`
    BeginDefine,
    /// Begin block tag `{+`
    BeginInsert,
    /// Begin partial tag `{>`
    BeginPartial,
    /// Begin named body tag `{:`
    BeginBody,
    /// Begin close tag `{/`
    BeginClose,
    /// End tag `}`
    End,
    /// Self closing end tag `/}`
    SelfClose,
    /// An unquoted partial name, e.g. `shared/header`
    Name,
    /// `.`
    Dot,
    /// `[`
    OpenBracket,
    /// `]`
    CloseBracket,
    /// `|`
    Pipe,
    /// `:`
    Colon,
    /// `=`
    Equals,
    /// Sequence of spaces, tabs and newlines
    Whitespace,
    /// A key, filter or helper name
    Ident,
    /// An integer or float literal, e.g. `19` or `-0.5`
    Number,
    /// A string literal, e.g. `"Hello {name}!"`
    String,
}

impl<'source> Lexer<'source> {
    /// Construct a new lexer.
    pub fn new(source: &'source str) -> Self {
        Self::with_range(source, 0, source.len())
    }

    /// Construct a new lexer over a region of the source. Spans are still
    /// relative to the whole source.
    pub fn with_range(source: &'source str, start: usize, end: usize) -> Self {
        Self {
            source,
            cursor: start,
            end,
            state: State::Template,
            next: None,
        }
    }

    /// Returns the next non-whitespace token and its span.
    pub fn next(&mut self) -> Result<Option<(Token, Span)>> {
        loop {
            match self.lex()? {
                Some((tk, sp)) if !tk.is_whitespace() => return Ok(Some((tk, sp))),
                None => return Ok(None),
                _ => continue,
            }
        }
    }

    /// Returns the next token and span.
    fn lex(&mut self) -> Result<Option<(Token, Span)>> {
        if let Some(next) = self.next.take() {
            return Ok(Some(next));
        }

        let i = self.cursor;

        if i >= self.end {
            return match self.state {
                State::Template => Ok(None),
                State::Tag { begin } | State::PartialName { begin } => {
                    Err(Error::syntax("unclosed tag", self.source, begin))
                }
            };
        }

        match self.state {
            State::Template => self.lex_template(i),
            State::Tag { begin } => self.lex_tag(begin, i),
            State::PartialName { begin } => self.lex_partial_name(begin, i),
        }
    }

    fn lex_template(&mut self, i: usize) -> Result<Option<(Token, Span)>> {
        // We are within raw template, that means all we have to do is
        // find the next tag from `i`. A `{` that does not start a tag is
        // part of the raw template, e.g. inline CSS or JavaScript.
        //
        // xxxxxxx{#xxxxxxxx
        //    ^   ^ ^
        //    i   j k

        let mut from = i;
        let found = loop {
            match self.source[from..self.end].find('{') {
                Some(d) => {
                    let j = from + d;
                    if let Some((tk, k)) = self.begin_at(j)? {
                        break Some((tk, j, k));
                    }
                    from = j + 1;
                }
                None => break None,
            }
        };

        match found {
            Some((tk, j, k)) => {
                let span = Span::from(j..k);
                self.cursor = k;
                if tk.is_begin_tag() {
                    let next = self.source[k..self.end].chars().next();
                    self.state = match (tk, next) {
                        (Token::BeginPartial, Some(c)) if c != '"' => {
                            State::PartialName { begin: span }
                        }
                        _ => State::Tag { begin: span },
                    };
                }
                if i == j {
                    // The current cursor is exactly at the token.
                    Ok(Some((tk, span)))
                } else {
                    // We must first emit the raw token, so we store the
                    // tag token in the `next` buffer.
                    self.next = Some((tk, span));
                    Ok(Some((Token::Raw, Span::from(i..j))))
                }
            }
            None => {
                let j = self.end;
                self.cursor = j;
                Ok(Some((Token::Raw, Span::from(i..j))))
            }
        }
    }

    /// Checks whether a tag starts at `j`, which must be a `{`. Returns the
    /// token and the end of the token.
    fn begin_at(&self, j: usize) -> Result<Option<(Token, usize)>> {
        let rest = &self.source[j + 1..self.end];
        let mut chars = rest.chars();
        let c = match chars.next() {
            Some(c) => c,
            None => return Ok(None),
        };
        let tk = match c {
            '#' => Token::BeginSection,
            '?' => Token::BeginExists,
            '^' => Token::BeginNotExists,
            '@' => Token::BeginHelper,
            '<' => Token::BeginDefine,
            '+' => Token::BeginInsert,
            '>' => Token::BeginPartial,
            ':' => Token::BeginBody,
            '/' => Token::BeginClose,
            '!' => {
                return match rest[1..].find("!}") {
                    Some(d) => Ok(Some((Token::Comment, j + 2 + d + 2))),
                    None => Err(Error::syntax("unclosed comment", self.source, j..j + 2)),
                };
            }
            '`' => {
                return match rest[1..].find("`}") {
                    Some(d) => Ok(Some((Token::RawText, j + 2 + d + 2))),
                    None => Err(Error::syntax("unclosed raw text", self.source, j..j + 2)),
                };
            }
            '~' => {
                let len = rest[1..]
                    .find(|c: char| !c.is_ascii_alphabetic())
                    .unwrap_or(rest.len() - 1);
                return match rest[1 + len..].starts_with('}') && len > 0 {
                    true => Ok(Some((Token::Special, j + 2 + len + 1))),
                    false => Ok(None),
                };
            }
            c if is_ident_start(c) || c == '.' => {
                return match is_reference(rest) {
                    true => Ok(Some((Token::BeginReference, j + 1))),
                    false => Ok(None),
                };
            }
            _ => return Ok(None),
        };
        match chars.next() {
            Some(c) if is_ident_start(c) || c == '.' || c == '"' => Ok(Some((tk, j + 2))),
            _ => Ok(None),
        }
    }

    fn lex_tag(&mut self, begin: Span, i: usize) -> Result<Option<(Token, Span)>> {
        // We are between `{` and `}` that means we must parse template syntax
        // relevant tokens and also lookout for the end of the tag.

        let mut iter = self.source[i..self.end]
            .char_indices()
            .map(|(d, c)| (i + d, c));

        let (i, c) = match iter.next() {
            Some(next) => next,
            None => return Err(Error::syntax("unclosed tag", self.source, begin)),
        };

        let (tk, j) = match c {
            '}' => {
                self.state = State::Template;
                (Token::End, i + 1)
            }
            '/' if self.source[i + 1..self.end].starts_with('}') => {
                self.state = State::Template;
                (Token::SelfClose, i + 2)
            }
            '.' => (Token::Dot, i + 1),
            '[' => (Token::OpenBracket, i + 1),
            ']' => (Token::CloseBracket, i + 1),
            '|' => (Token::Pipe, i + 1),
            ':' => (Token::Colon, i + 1),
            '=' => (Token::Equals, i + 1),
            '"' => self.lex_string(iter, i)?,
            '-' if matches!(iter.clone().next(), Some((_, c)) if c.is_ascii_digit()) => {
                self.lex_number(i)
            }
            c if c.is_ascii_digit() => self.lex_number(i),
            c if is_whitespace(c) => (Token::Whitespace, self.lex_while(iter, is_whitespace)),
            c if is_ident_start(c) => (Token::Ident, self.lex_while(iter, is_ident)),
            _ => {
                return Err(Error::syntax(
                    "unexpected character",
                    self.source,
                    i..(i + c.len_utf8()),
                ));
            }
        };

        self.cursor = j;
        Ok(Some((tk, Span::from(i..j))))
    }

    fn lex_partial_name(&mut self, begin: Span, i: usize) -> Result<Option<(Token, Span)>> {
        let rest = &self.source[i..self.end];
        let mut j = self.end;
        for (d, c) in rest.char_indices() {
            let stop = match c {
                '}' | ':' => true,
                '/' => rest[d + 1..].starts_with('}'),
                c => is_whitespace(c),
            };
            if stop {
                j = i + d;
                break;
            }
        }
        self.state = State::Tag { begin };
        if i == j {
            // Nothing that looks like a name, let the tag lexer handle it.
            return self.lex_tag(begin, i);
        }
        self.cursor = j;
        Ok(Some((Token::Name, Span::from(i..j))))
    }

    fn lex_number(&self, i: usize) -> (Token, usize) {
        // The first character is either a digit or a minus sign.
        let bytes = self.source.as_bytes();
        let digits = |mut j: usize| {
            while j < self.end && bytes[j].is_ascii_digit() {
                j += 1;
            }
            j
        };
        let mut j = digits(i + 1);
        if j + 1 < self.end && bytes[j] == b'.' && bytes[j + 1].is_ascii_digit() {
            j = digits(j + 1);
        }
        (Token::Number, j)
    }

    fn lex_string<I>(&mut self, mut iter: I, i: usize) -> Result<(Token, usize)>
    where
        I: Iterator<Item = (usize, char)> + Clone,
    {
        let mut escaped = false;
        loop {
            match iter.next() {
                None => {
                    return Err(Error::syntax(
                        "undelimited string",
                        self.source,
                        i..self.end,
                    ));
                }
                Some((j, '"')) if !escaped => {
                    return Ok((Token::String, j + 1));
                }
                Some((_, c)) => {
                    escaped = !escaped && c == '\\';
                }
            }
        }
    }

    fn lex_while<I, P>(&mut self, mut iter: I, pred: P) -> usize
    where
        I: Iterator<Item = (usize, char)> + Clone,
        P: Fn(char) -> bool,
    {
        loop {
            match iter.clone().next() {
                Some((_, c)) if pred(c) => {
                    iter.next();
                }
                Some((j, _)) => return j,
                None => return self.end,
            }
        }
    }
}

impl Token {
    pub fn human(&self) -> &'static str {
        match self {
            Self::Raw => "raw template",
            Self::Comment => "comment",
            Self::RawText => "raw text",
            Self::Special => "special character",
            Self::BeginReference => "begin reference",
            Self::BeginSection => "begin section",
            Self::BeginExists => "begin exists section",
            Self::BeginNotExists => "begin not exists section",
            Self::BeginHelper => "begin helper",
            Self::BeginDefine => "begin inline partial",
            Self::BeginInsert => "begin block",
            Self::BeginPartial => "begin partial",
            Self::BeginBody => "begin body",
            Self::BeginClose => "close tag",
            Self::End => "end tag",
            Self::SelfClose => "self closing end tag",
            Self::Name => "partial name",
            Self::Dot => "member access operator",
            Self::OpenBracket => "open bracket",
            Self::CloseBracket => "close bracket",
            Self::Pipe => "pipe",
            Self::Colon => "colon",
            Self::Equals => "equals",
            Self::Whitespace => "whitespace",
            Self::Ident => "identifier",
            Self::Number => "number",
            Self::String => "string",
        }
    }

    fn is_begin_tag(&self) -> bool {
        matches!(
            self,
            Self::BeginReference
                | Self::BeginSection
                | Self::BeginExists
                | Self::BeginNotExists
                | Self::BeginHelper
                | Self::BeginDefine
                | Self::BeginInsert
                | Self::BeginPartial
                | Self::BeginBody
                | Self::BeginClose
        )
    }

    fn is_whitespace(&self) -> bool {
        matches!(self, Self::Whitespace)
    }
}

/// Whether the text following a `{` is a complete reference such as
/// `user.name|h}`. Anything else, e.g. `{ color: red }`, is raw template.
fn is_reference(rest: &str) -> bool {
    for (i, c) in rest.char_indices() {
        match c {
            '}' => return i > 0,
            '.' | '[' | ']' | '|' => {}
            c if is_ident(c) => {}
            _ => return false,
        }
    }
    false
}

fn is_whitespace(c: char) -> bool {
    matches!(c, '\t' | ' ' | '\r' | '\n')
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident(c: char) -> bool {
    matches!(c, '_' | '$' | '-') || c.is_alphanumeric()
}
