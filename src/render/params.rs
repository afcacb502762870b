use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::render::chunk::{Chunk, Origin};
use crate::render::Context;
use crate::types::ast;
use crate::value::Map;
use crate::{Error, Value};

/// The parameters passed to a helper, section or partial.
///
/// Values are resolved lazily when asked for: literals as is, paths against
/// the context and quoted strings with tags by rendering them. The first
/// error raised while rendering a quoted string is kept until the caller
/// moves it onto its chunk.
pub struct Params<'a> {
    params: &'a [ast::Param],
    ctx: &'a Context<'a>,
    origin: Origin<'a>,
    error: RefCell<Option<Error>>,
}

/// The bodies passed to a helper.
#[derive(Debug, Clone, Copy)]
pub struct Bodies<'a> {
    block: Option<&'a ast::Body>,
    named: &'a BTreeMap<String, ast::Body>,
}

static EMPTY: ast::Body = ast::Body::new();

impl<'a> Params<'a> {
    pub(crate) fn new(params: &'a [ast::Param], ctx: &'a Context<'a>, origin: Origin<'a>) -> Self {
        Self {
            params,
            ctx,
            origin,
            error: RefCell::new(None),
        }
    }

    /// Takes the first error raised while resolving a parameter.
    pub(crate) fn take_error(&self) -> Option<Error> {
        self.error.take()
    }

    /// Whether a parameter with the given name was passed.
    pub fn has(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Whether the named parameter was written as a plain quoted string,
    /// e.g. `key="name"`.
    pub(crate) fn is_literal_str(&self, name: &str) -> bool {
        matches!(
            self.find(name).map(|p| &p.value),
            Some(ast::ParamValue::Literal(ast::Literal::String(_)))
        )
    }

    /// Resolves the named parameter.
    ///
    /// Returns `None` if the parameter was not passed or if it names a path
    /// that does not exist.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.find(name).and_then(|param| self.resolve(param))
    }

    /// Resolves the named parameter as a string.
    pub fn get_str(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s),
            Value::None => None,
            v => Some(v.to_string()),
        }
    }

    /// Returns the parameter names in the order they were written.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.name.as_str())
    }

    /// Resolves every parameter into a map, skipping missing paths.
    pub fn resolve_all(&self) -> Map<String, Value> {
        self.params
            .iter()
            .filter_map(|param| Some((param.name.name.clone(), self.resolve(param)?)))
            .collect()
    }

    fn find(&self, name: &str) -> Option<&'a ast::Param> {
        self.params.iter().rev().find(|p| p.name.name == name)
    }

    fn resolve(&self, param: &ast::Param) -> Option<Value> {
        match &param.value {
            ast::ParamValue::Literal(ast::Literal::String(s)) => Some(Value::String(s.clone())),
            ast::ParamValue::Literal(ast::Literal::Integer(n)) => Some(Value::Integer(*n)),
            ast::ParamValue::Literal(ast::Literal::Float(n)) => Some(Value::Float(*n)),
            ast::ParamValue::Path(path) => self.ctx.get(path).map(|v| v.into_owned()),
            ast::ParamValue::Interpolated(body) => {
                let mut chunk = Chunk::new(self.origin);
                chunk.render(body, self.ctx);
                let (out, err) = chunk.into_parts();
                if let Some(err) = err {
                    tracing::debug!(param = %param.name.name, "{}", err.message());
                    self.error.borrow_mut().get_or_insert(err);
                }
                Some(Value::String(out))
            }
        }
    }
}

impl<'a> Bodies<'a> {
    pub(crate) fn new(
        block: Option<&'a ast::Body>,
        named: &'a BTreeMap<String,
        ast::Body>,
    ) -> Self {
        Self { block, named }
    }

    /// Returns the main body, empty if the helper was self-closing.
    pub fn block(&self) -> &'a ast::Body {
        self.block.unwrap_or(&EMPTY)
    }

    /// Whether the helper was given a main body.
    pub fn has_block(&self) -> bool {
        self.block.is_some()
    }

    /// Returns a body by name, e.g. `else`. The name `block` refers to the
    /// main body.
    pub fn get(&self, name: &str) -> Option<&'a ast::Body> {
        match name {
            "block" => self.block,
            name => self.named.get(name),
        }
    }
}
