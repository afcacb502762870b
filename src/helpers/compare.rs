//! The comparison helpers and `select`.

use std::cmp::Ordering;

use crate::render::{Bodies, Chunk, Context, Params, Select};
use crate::{Error, Result, Value};

pub fn eq(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    compare(chunk, ctx, bodies, params, |ord| ord == Some(Ordering::Equal))
}

pub fn ne(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    compare(chunk, ctx, bodies, params, |ord| ord != Some(Ordering::Equal))
}

pub fn lt(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    compare(chunk, ctx, bodies, params, |ord| ord == Some(Ordering::Less))
}

pub fn lte(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    compare(chunk, ctx, bodies, params, |ord| {
        matches!(ord, Some(Ordering::Less | Ordering::Equal))
    })
}

pub fn gt(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    compare(chunk, ctx, bodies, params, |ord| ord == Some(Ordering::Greater))
}

pub fn gte(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    compare(chunk, ctx, bodies, params, |ord| {
        matches!(ord, Some(Ordering::Greater | Ordering::Equal))
    })
}

/// Compares `key` against `value`, rendering the body if `test` passes and
/// the `else` body otherwise.
///
/// Inside a `{@select}` the key defaults to the select key and once one
/// comparison has matched the rest render nothing.
fn compare<F>(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    params: &Params<'_>,
    test: F,
) -> Result<()>
where
    F: FnOnce(Option<Ordering>) -> bool,
{
    let select = ctx.select();
    let key = match (params.has("key"), select) {
        (true, _) => params.get("key").unwrap_or_default(),
        (false, Some(select)) => select.key().clone(),
        (false, None) => return Err(Error::new("comparison requires a `key` parameter")),
    };
    let value = params.get("value").unwrap_or_default();
    let (key, value) = match params.get_str("type") {
        Some(ty) => (cast(key, &ty), cast(value, &ty)),
        None => (key, value),
    };

    if select.map_or(false, Select::is_resolved) {
        return Ok(());
    }
    if test(key.loose_cmp(&value)) {
        if let Some(select) = select {
            select.resolve();
        }
        chunk.render(bodies.block(), ctx);
    } else if let Some(otherwise) = bodies.get("else") {
        chunk.render(otherwise, ctx);
    }
    Ok(())
}

fn cast(value: Value, ty: &str) -> Value {
    match ty {
        "number" => value.as_number().unwrap_or(Value::Integer(0)),
        "string" => Value::String(value.to_string()),
        "boolean" => match value {
            Value::String(s) if s == "false" => Value::Bool(false),
            v => Value::Bool(v.is_truthy()),
        },
        _ => value,
    }
}

/// Establishes the state that nested comparisons share.
pub fn select(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    if !params.has("key") {
        return Err(Error::new("select requires a `key` parameter"));
    }
    let key = params.get("key").unwrap_or_default();
    let key = match params.get_str("type") {
        Some(ty) => cast(key, &ty),
        None => key,
    };
    let state = Select::new(key);
    let ctx = ctx.push_select(&state);
    chunk.render(bodies.block(), &ctx);
    Ok(())
}

pub fn any(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    _: &Params<'_>,
) -> Result<()> {
    let select = ctx.select().ok_or_else(|| Error::new("any must be inside a select"))?;
    if select.is_resolved() {
        chunk.render(bodies.block(), ctx);
    }
    Ok(())
}

pub fn none(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    _: &Params<'_>,
) -> Result<()> {
    let select = ctx.select().ok_or_else(|| Error::new("none must be inside a select"))?;
    if !select.is_resolved() {
        chunk.render(bodies.block(), ctx);
    }
    Ok(())
}
