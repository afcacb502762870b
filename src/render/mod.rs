mod chunk;
mod context;
pub(crate) mod core;
mod params;

use serde::Serialize;

pub use crate::render::chunk::Chunk;
pub use crate::render::context::{Context, Iteration, Select};
pub use crate::render::params::{Bodies, Params};
use crate::render::core::RendererImpl;
use crate::types::ast::Template;
use crate::{Engine, Error, Result, Value};

/// A renderer that evaluates a compiled [`Template`] against some data.
///
/// This struct is created by [`Engine::renderer`].
#[must_use = "must call `.to_string()` or `.to_output()` on the renderer"]
pub struct Renderer<'render> {
    engine: &'render Engine,
    template: &'render Template,
    name: Option<&'render str>,
    data: Result<Value>,
    globals: Result<Value>,
    max_include_depth: Option<usize>,
}

/// The output of a render along with the first error recorded, if any.
///
/// Errors raised while rendering do not stop the render, so the text is
/// always complete.
#[derive(Debug)]
pub struct Rendered {
    text: String,
    error: Option<Error>,
}

pub(crate) struct RenderSettings {
    pub(crate) max_include_depth: usize,
}

impl<'render> Renderer<'render> {
    pub(crate) fn new<S>(engine: &'render Engine, template: &'render Template, data: S) -> Self
    where
        S: Serialize,
    {
        Self {
            engine,
            template,
            name: None,
            data: crate::to_value(data),
            globals: Ok(Value::None),
            max_include_depth: None,
        }
    }

    pub(crate) fn with_name(mut self, name: &'render str) -> Self {
        self.name = Some(name);
        self
    }

    /// Set values that are visible from every template, after the render
    /// data.
    pub fn with_globals<S>(mut self, globals: S) -> Self
    where
        S: Serialize,
    {
        self.globals = crate::to_value(globals);
        self
    }

    /// Set the maximum number of nested partials.
    ///
    /// Defaults to the engine setting.
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = Some(depth);
        self
    }

    /// Render the template to a string, failing on the first recorded error.
    #[allow(clippy::wrong_self_convention, clippy::inherent_to_string)]
    pub fn to_string(self) -> Result<String> {
        let Rendered { text, error } = self.to_output()?;
        match error {
            Some(err) => Err(err),
            None => Ok(text),
        }
    }

    /// Render the template, returning the output even if an error was
    /// recorded.
    #[allow(clippy::wrong_self_convention)]
    pub fn to_output(self) -> Result<Rendered> {
        let data = self.data?;
        let globals = self.globals?;
        let renderer = RendererImpl {
            engine: self.engine,
            settings: RenderSettings {
                max_include_depth: self
                    .max_include_depth
                    .unwrap_or(self.engine.max_include_depth),
            },
        };
        let (text, error) = renderer.render(self.template, data, globals);
        let error = match (error, self.name) {
            (Some(err), Some(name)) => Some(err.with_template_name(name)),
            (error, _) => error,
        };
        Ok(Rendered { text, error })
    }
}

impl Rendered {
    /// Returns the rendered text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the first error recorded during the render.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
