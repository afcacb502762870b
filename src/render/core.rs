use std::path::Path;

use crate::helpers::Helper;
use crate::render::chunk::{Chunk, Origin};
use crate::render::context::{Iteration, Scope};
use crate::render::params::{Bodies, Params};
use crate::render::{Context, RenderSettings};
use crate::types::ast;
use crate::value::ValueCow;
use crate::{Engine, Error, Value};

/// Evaluates template bodies into chunks.
pub(crate) struct RendererImpl<'render> {
    pub(crate) engine: &'render Engine,
    pub(crate) settings: RenderSettings,
}

impl<'render> RendererImpl<'render> {
    /// Render a whole template, returning the output and the first error
    /// encountered, if any.
    pub(crate) fn render(
        &self,
        template: &ast::Template,
        data: Value,
        globals: Value,
    ) -> (String, Option<Error>) {
        let scope = Scope::new(data, globals);
        let root = Context::root(&scope);
        let ctx = root.push_blocks(&template.blocks);
        let mut chunk = Chunk::new(Origin {
            renderer: self,
            template,
            depth: 0,
        });
        chunk.render(&template.body, &ctx);
        chunk.into_parts()
    }

    /// Calls every `Prerun` helper in the template with its parameters
    /// resolved against empty data, recording the names of those called.
    pub(crate) fn prerun(&self, template: &ast::Template, ran: &mut Vec<String>) {
        let scope = Scope::new(Value::None, Value::None);
        let ctx = Context::root(&scope);
        let origin = Origin {
            renderer: self,
            template,
            depth: 0,
        };
        for body in std::iter::once(&template.body).chain(template.blocks.values()) {
            body.visit(&mut |part| {
                let ast::Part::Helper(call) = part else {
                    return;
                };
                if let Some(Helper::Prerun(f)) = self.engine.helpers.get(&call.name.name) {
                    f(&ctx, &Params::new(&call.params, &ctx, origin));
                    if !ran.contains(&call.name.name) {
                        ran.push(call.name.name.clone());
                    }
                }
            });
        }
    }

    pub(crate) fn render_body(&self, chunk: &mut Chunk<'_>, body: &ast::Body, ctx: &Context<'_>) {
        for part in &body.parts {
            match part {
                ast::Part::Text(text) => chunk.write(text),
                ast::Part::Comment(_) => {}
                ast::Part::Reference(reference) => self.render_reference(chunk, reference, ctx),
                ast::Part::Section(section) => self.render_section(chunk, section, ctx),
                ast::Part::Helper(call) => self.render_helper(chunk, call, ctx),
                ast::Part::Block(block) => self.render_block(chunk, block, ctx),
                ast::Part::Partial(partial) => self.render_partial(chunk, partial, ctx),
            }
        }
    }

    fn render_reference(
        &self,
        chunk: &mut Chunk<'_>,
        reference: &ast::Reference,
        ctx: &Context<'_>,
    ) {
        let value = match ctx.get(&reference.path) {
            Some(value) => value.into_owned(),
            None => return,
        };
        let value = self.apply_filters(chunk, value, &reference.filters);
        chunk.write_display(&value);
    }

    /// Applies the given filters in order, followed by the automatic filters
    /// unless the list contains `s`.
    pub(crate) fn apply_filters(
        &self,
        chunk: &mut Chunk<'_>,
        mut value: Value,
        filters: &[ast::Ident],
    ) -> Value {
        let mut suppress = false;
        for filter in filters {
            if filter.name == "s" {
                suppress = true;
                continue;
            }
            match self.engine.filters.get(&filter.name) {
                Some(f) => value = f(value),
                None => {
                    tracing::warn!(filter = %filter.name, "unknown filter");
                    let err = Error::new(format!("unknown filter `{}`", filter.name));
                    chunk.set_error_at(err, filter.span);
                }
            }
        }
        if suppress {
            return value;
        }
        for name in &self.engine.automatic_filters {
            if filters.iter().any(|f| &f.name == name) {
                continue;
            }
            if let Some(f) = self.engine.filters.get(name) {
                value = f(value);
            }
        }
        value
    }

    fn render_section(&self, chunk: &mut Chunk<'_>, section: &ast::Section, ctx: &Context<'_>) {
        let value = ctx.get(&section.key);
        let body = section.body.as_ref();
        let otherwise = section.bodies.get("else");

        let frame = if section.params.is_empty() {
            None
        } else {
            let params = Params::new(&section.params, ctx, chunk.origin());
            let frame = params.resolve_all();
            if let Some(err) = params.take_error() {
                chunk.set_error(err);
            }
            Some(Value::Map(frame))
        };
        let with_params;
        let ctx = match &frame {
            Some(frame) => {
                with_params = ctx.push(ValueCow::Borrowed(frame));
                &with_params
            }
            None => ctx,
        };

        let truthy = value.as_deref().map_or(false, Value::is_truthy);
        let body = match (section.kind, truthy) {
            (ast::SectionKind::Section, true) => body,
            (ast::SectionKind::Exists, true) | (ast::SectionKind::NotExists, false) => {
                if let Some(body) = body {
                    chunk.render(body, ctx);
                }
                return;
            }
            _ => {
                if let Some(otherwise) = otherwise {
                    chunk.render(otherwise, ctx);
                }
                return;
            }
        };
        let (Some(body), Some(value)) = (body, value.as_deref()) else {
            return;
        };

        match value {
            Value::List(list) => {
                let len = list.len();
                for (index, item) in list.iter().enumerate() {
                    let it = Iteration { index, len };
                    let ctx = ctx.push_iteration(ValueCow::Borrowed(item), it);
                    chunk.render(body, &ctx);
                }
            }
            value => {
                let ctx = ctx.push(ValueCow::Borrowed(value));
                chunk.render(body, &ctx);
            }
        }
    }

    fn render_block(&self, chunk: &mut Chunk<'_>, block: &ast::Block, ctx: &Context<'_>) {
        if let Some(body) = ctx.get_block(&block.name.name).or(block.body.as_ref()) {
            chunk.render(body, ctx);
        }
    }

    fn render_helper(&self, chunk: &mut Chunk<'_>, call: &ast::HelperCall, ctx: &Context<'_>) {
        let name = &call.name.name;
        let helper = match self.engine.helpers.get(name) {
            Some(helper) => helper,
            None => {
                tracing::warn!(helper = %name, "unknown helper");
                chunk.set_error_at(Error::new(format!("unknown helper `{name}`")), call.name.span);
                return;
            }
        };
        let params = Params::new(&call.params, ctx, chunk.origin());
        let bodies = Bodies::new(call.body.as_ref(), &call.bodies);
        let result = match helper {
            Helper::Prerun(_) => Ok(()),
            Helper::Init(f) => f(chunk, ctx, &bodies, &params),
            Helper::Output(f) => f(ctx, &params).map(|value| chunk.write_display(&value)),
        };
        if let Some(err) = params.take_error() {
            chunk.set_error(err);
        }
        if let Err(err) = result {
            tracing::debug!(helper = %name, "{}", err.message());
            chunk.set_error_at(err, call.span);
        }
    }

    fn render_partial(&self, chunk: &mut Chunk<'_>, partial: &ast::Partial, ctx: &Context<'_>) {
        let origin = chunk.origin();
        let max = self.settings.max_include_depth;
        if origin.depth >= max {
            let err = Error::new(format!("reached the maximum include depth ({max})"));
            chunk.set_error_at(err, partial.span);
            return;
        }

        let name = match &partial.name {
            ast::PartialName::Static(name) => name.clone(),
            ast::PartialName::Dynamic(body) => {
                let mut named = chunk.fork();
                named.render(body, ctx);
                let (name, err) = named.into_parts();
                if let Some(err) = err {
                    chunk.set_error(err);
                }
                name
            }
        };

        let base = origin.template.path().and_then(Path::parent);
        let template = match self.engine.load_partial(&name, base) {
            Ok(Some(template)) => template,
            Ok(None) => {
                tracing::warn!(partial = %name, "template not found");
                return;
            }
            Err(err) => {
                chunk.set_error_at(err, partial.span);
                return;
            }
        };
        tracing::trace!(partial = %name, depth = origin.depth + 1, "including");

        let params = Params::new(&partial.params, ctx, origin);
        let resolved = params.resolve_all();
        if let Some(err) = params.take_error() {
            chunk.set_error(err);
        }
        let value = partial.context.as_ref().and_then(|path| ctx.get(path));
        let with_value;
        let ctx = match value {
            Some(value) => {
                with_value = ctx.push(value);
                &with_value
            }
            None => ctx,
        };
        let params = (!resolved.is_empty()).then(|| Value::Map(resolved));
        let with_params;
        let ctx = match &params {
            Some(params) => {
                with_params = ctx.push(ValueCow::Borrowed(params));
                &with_params
            }
            None => ctx,
        };
        let ctx = ctx.push_blocks(&template.blocks);

        let mut child = Chunk::new(Origin {
            renderer: origin.renderer,
            template: &template,
            depth: origin.depth + 1,
        });
        child.render(&template.body, &ctx);
        let (out, err) = child.into_parts();
        chunk.write(&out);
        if let Some(err) = err {
            chunk.set_error(err.with_template_name(&name));
        }
    }
}
