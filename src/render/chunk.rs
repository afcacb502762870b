use std::fmt;

use crate::render::core::RendererImpl;
use crate::render::Context;
use crate::types::ast;
use crate::{Error, Value};

/// Where a chunk is rendering: the renderer, the template being evaluated
/// and how many partials deep it is.
#[derive(Clone, Copy)]
pub(crate) struct Origin<'a> {
    pub renderer: &'a RendererImpl<'a>,
    pub template: &'a ast::Template,
    pub depth: usize,
}

/// An output buffer that a template renders into.
///
/// Helpers receive the chunk so they can write text, render bodies or record
/// an error. Only the first recorded error is kept, rendering carries on
/// regardless.
pub struct Chunk<'a> {
    origin: Origin<'a>,
    out: String,
    error: Option<Error>,
}

impl<'a> Chunk<'a> {
    pub(crate) fn new(origin: Origin<'a>) -> Self {
        Self {
            origin,
            out: String::with_capacity(origin.template.source.len()),
            error: None,
        }
    }

    pub(crate) fn origin(&self) -> Origin<'a> {
        self.origin
    }

    /// Append text verbatim.
    pub fn write(&mut self, s: &str) {
        self.out.push_str(s);
    }

    /// Append a value the way a reference would, applying the automatic
    /// filters.
    pub fn write_value(&mut self, value: Value) {
        let renderer = self.origin.renderer;
        let value = renderer.apply_filters(self, value, &[]);
        self.write_display(&value);
    }

    pub(crate) fn write_display(&mut self, value: &dyn fmt::Display) {
        use fmt::Write;
        // Writing to a `String` cannot fail.
        let _ = write!(self.out, "{value}");
    }

    /// Evaluate a body against the given context, appending the output.
    pub fn render(&mut self, body: &ast::Body, ctx: &Context<'_>) {
        let renderer = self.origin.renderer;
        renderer.render_body(self, body, ctx);
    }

    /// Returns a new empty chunk rendering in the same place as this one.
    ///
    /// Use together with [`append`][Chunk::append] to post-process the
    /// output of a body.
    pub fn fork(&self) -> Chunk<'a> {
        Chunk {
            origin: self.origin,
            out: String::new(),
            error: None,
        }
    }

    /// Append the output of another chunk, taking its error if this chunk
    /// has none yet.
    pub fn append(&mut self, other: Chunk<'_>) {
        let (out, error) = other.into_parts();
        self.out.push_str(&out);
        if let Some(err) = error {
            self.set_error(err);
        }
    }

    /// Record an error.
    pub fn set_error(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Record an error, pointing it at a location in the current template.
    pub(crate) fn set_error_at(&mut self, err: Error, span: crate::types::span::Span) {
        let err = err.with_span(&self.origin.template.source, span);
        self.set_error(err);
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Returns the output so far.
    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn into_output(self) -> String {
        self.out
    }

    pub(crate) fn into_parts(self) -> (String, Option<Error>) {
        (self.out, self.error)
    }
}

impl fmt::Debug for Chunk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("out", &self.out)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
