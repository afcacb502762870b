use std::cmp::max;
use std::fmt;
use std::io;
use std::path::Path;

use crate::types::span::Span;

/// The category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The template source is malformed.
    Syntax,
    /// Something went wrong while evaluating a template, e.g. an unknown
    /// helper or a helper used outside of its intended context.
    Render,
    /// A template file could not be read.
    Io,
    /// Data could not be converted to or from a [`Value`][crate::Value].
    Serialize,
}

/// An error that can occur during template compilation or rendering.
#[derive(Clone)]
pub struct Error {
    kind: ErrorKind,
    msg: String,
    name: Option<String>,
    span: Option<(String, Span)>,
}

impl Error {
    /// Construct a new render error with the given message.
    ///
    /// Helpers use this to report structural misuse, the error is recorded on
    /// the current chunk and rendering continues.
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Render,
            msg: msg.into(),
            name: None,
            span: None,
        }
    }

    pub(crate) fn syntax(msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            msg: msg.into(),
            name: None,
            span: Some((source.to_string(), span.into())),
        }
    }

    pub(crate) fn io(err: io::Error, path: &Path) -> Self {
        Self {
            kind: ErrorKind::Io,
            msg: format!("failed to read `{}`: {err}", path.display()),
            name: None,
            span: None,
        }
    }

    /// Attach a location to an error raised without one.
    pub(crate) fn with_span(mut self, source: &str, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some((source.to_owned(), span));
        }
        self
    }

    /// Attach the name of the template the error occurred in, unless one is
    /// already set.
    pub(crate) fn with_template_name(mut self, name: &str) -> Self {
        if self.name.is_none() {
            self.name = Some(name.to_owned());
        }
        self
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the name of the template this error occurred in, if known.
    pub fn template_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the error message without any source context.
    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self {
            kind: ErrorKind::Serialize,
            msg: err.to_string(),
            name: None,
            span: None,
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some((source, span)) => fmt_pretty(&self.msg, self.name.as_deref(), source, *span, f),
            None => write!(f, "{}", self.msg),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some((source, span)) if f.alternate() => {
                fmt_pretty(&self.msg, self.name.as_deref(), source, *span, f)
            }
            Some((_, span)) => {
                write!(f, "{} between bytes {} and {}", self.msg, span.m, span.n)
            }
            None => write!(f, "{}", self.msg),
        }
    }
}

fn fmt_pretty(
    msg: &str,
    name: Option<&str>,
    source: &str,
    span: Span,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let lines: Vec<_> = source.split_terminator('\n').collect();
    let (line, col) = to_line_col(&lines, span.m);
    let len = max(1, source.get(span.m..span.n).map(width).unwrap_or(0));
    let code = lines
        .get(line)
        .or_else(|| lines.last())
        .copied()
        .unwrap_or_default();

    let num = (line + 1).to_string();
    let pad = width(&num);
    let underline = "^".repeat(len);

    if let Some(name) = name {
        write!(f, "\n  --> {name}:{}:{}", line + 1, col + 1)?;
    }
    write!(
        f,
        "\n \
        {0:pad$} |\n \
        {num:>} | {code}\n \
        {0:pad$} | {underline:>width$} {msg}\n",
        "",
        pad = pad,
        num = num,
        code = code,
        underline = underline,
        width = col + len,
        msg = msg
    )
}

fn to_line_col(lines: &[&str], offset: usize) -> (usize, usize) {
    let mut n = 0;
    for (i, line) in lines.iter().enumerate() {
        let len = line.len() + 1;
        if n + len > offset {
            let col = line.get(..offset - n).map(width).unwrap_or(offset - n);
            return (i, col);
        }
        n += len;
    }
    (lines.len(), lines.last().map(|l| width(l)).unwrap_or(0))
}

#[cfg(feature = "unicode")]
fn width(s: &str) -> usize {
    unicode_width::UnicodeWidthStr::width(s)
}

#[cfg(not(feature = "unicode"))]
fn width(s: &str) -> usize {
    s.chars().count()
}
