//! AST representing a compiled template.
//!
//! Every node is plain data: the tree is built once by the parser and only
//! ever read afterwards, so it can be shared freely between renders and
//! persisted with serde.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::span::Span;

/// A compiled template.
///
/// Created by [`Engine::compile`][crate::Engine::compile] or
/// [`Engine::compile_file`][crate::Engine::compile_file].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub(crate) source: String,
    pub(crate) body: Body,
    /// Inline partials declared with `{<name}...{/name}`.
    pub(crate) blocks: BTreeMap<String, Body>,
    pub(crate) path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Part {
    /// Literal text, written as is.
    Text(String),
    /// `{path|f1|f2}`
    Reference(Reference),
    /// `{#path}`, `{?path}` or `{^path}`
    Section(Section),
    /// `{@name}`
    Helper(HelperCall),
    /// `{+name}`
    Block(Block),
    /// `{>name/}`
    Partial(Partial),
    /// `{! text !}`
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub path: Path,
    pub filters: Vec<Ident>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub anchor: Anchor,
    pub keys: Vec<Key>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anchor {
    /// `a.b`: the first key is searched for up the context chain.
    Relative,
    /// `.a.b` or `.`: only the current frame is consulted.
    Current,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Key {
    Name(String),
    Index(usize),
    /// `a[b.c]`, the key is resolved from the context.
    Expr(Path),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionKind {
    Section,
    Exists,
    NotExists,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub key: Path,
    pub params: Vec<Param>,
    pub body: Option<Body>,
    pub bodies: BTreeMap<String, Body>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperCall {
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Option<Body>,
    pub bodies: BTreeMap<String, Body>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub name: Ident,
    pub body: Option<Body>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partial {
    pub name: PartialName,
    pub context: Option<Path>,
    pub params: Vec<Param>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PartialName {
    Static(String),
    /// `{>"page-{type}"/}`
    Dynamic(Body),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Ident,
    pub value: ParamValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Path(Path),
    Literal(Literal),
    /// A quoted string containing tags, e.g. `"{first} {last}"`.
    Interpolated(Body),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
}

impl Template {
    /// Returns the original template source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the file this template was loaded from, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }

    /// Returns the names of all helpers called by this template, in order
    /// of first appearance.
    pub fn helpers(&self) -> Vec<&str> {
        self.collect(|part| match part {
            Part::Helper(call) => Some(call.name.name.as_str()),
            _ => None,
        })
    }

    /// Returns the names of all statically named partials included by this
    /// template.
    pub fn partials(&self) -> Vec<&str> {
        self.collect(|part| match part {
            Part::Partial(Partial {
                name: PartialName::Static(name),
                ..
            }) => Some(name.as_str()),
            _ => None,
        })
    }

    fn collect<'a, F>(&'a self, pick: F) -> Vec<&'a str>
    where
        F: Fn(&'a Part) -> Option<&'a str>,
    {
        let mut names = Vec::new();
        for body in std::iter::once(&self.body).chain(self.blocks.values()) {
            body.visit(&mut |part| {
                if let Some(name) = pick(part) {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            });
        }
        names
    }
}

impl Body {
    pub const fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// Returns the text if this body is a single literal.
    pub fn as_text(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [] => Some(""),
            [Part::Text(text)] => Some(text),
            _ => None,
        }
    }

    /// Appends a part, merging adjacent text.
    pub fn push(&mut self, part: Part) {
        if let Part::Text(text) = &part {
            if text.is_empty() {
                return;
            }
            if let Some(Part::Text(last)) = self.parts.last_mut() {
                last.push_str(text);
                return;
            }
        }
        self.parts.push(part);
    }

    /// Calls `f` for every part in this body, depth first.
    pub fn visit<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Part),
    {
        for part in &self.parts {
            f(part);
            match part {
                Part::Section(Section { body, bodies, .. })
                | Part::Helper(HelperCall { body, bodies, .. }) => {
                    if let Some(body) = body {
                        body.visit(f);
                    }
                    for body in bodies.values() {
                        body.visit(f);
                    }
                }
                Part::Block(Block {
                    body: Some(body), ..
                }) => body.visit(f),
                _ => {}
            }
        }
    }
}
