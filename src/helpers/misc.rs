use crate::render::{Bodies, Chunk, Context, Params};
use crate::{Error, Result, Value};

pub fn first(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    _: &Params<'_>,
) -> Result<()> {
    if matches!(ctx.iteration(), Some(it) if it.index == 0) {
        chunk.render(bodies.block(), ctx);
    }
    Ok(())
}

pub fn last(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    _: &Params<'_>,
) -> Result<()> {
    if matches!(ctx.iteration(), Some(it) if it.index + 1 == it.len) {
        chunk.render(bodies.block(), ctx);
    }
    Ok(())
}

/// Renders the body between elements, i.e. when
/// `start <= $idx < $len - end`.
pub fn sep(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    let it = ctx
        .iteration()
        .ok_or_else(|| Error::new("Sep must be inside an array"))?;
    let int = |name, default| match params.get(name).as_ref().and_then(Value::as_number) {
        Some(Value::Integer(n)) => n,
        Some(Value::Float(n)) => n as i64,
        _ => default,
    };
    let start = int("start", 0);
    let end = int("end", 1);
    let index = it.index as i64;
    if index >= start && index < it.len as i64 - end {
        chunk.render(bodies.block(), ctx);
    }
    Ok(())
}

pub fn if_(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    if !params.has("cond") {
        return Err(Error::new("if requires a `cond` parameter"));
    }
    if params.get("cond").map_or(false, |v| v.is_truthy()) {
        chunk.render(bodies.block(), ctx);
    } else if let Some(otherwise) = bodies.get("else") {
        chunk.render(otherwise, ctx);
    }
    Ok(())
}

/// Writes `key`, or `value` when the key is missing.
///
/// Without a `key` inside a `{@select}` this renders its body when no
/// comparison has matched.
pub fn default(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    if !params.has("key") {
        let select = ctx
            .select()
            .ok_or_else(|| Error::new("default requires a `key` parameter"))?;
        if !select.is_resolved() {
            chunk.render(bodies.block(), ctx);
        }
        return Ok(());
    }
    let value = params
        .get("key")
        .filter(|v| !matches!(v, Value::None))
        .or_else(|| params.get("value"));
    if let Some(value) = value {
        chunk.write_value(value);
    }
    Ok(())
}

pub fn size(_: &Context<'_>, params: &Params<'_>) -> Result<Value> {
    let size = params.get("key").map_or(0, |v| v.size());
    Ok(Value::from(size))
}

/// Returns `object[key]`.
pub fn get(_: &Context<'_>, params: &Params<'_>) -> Result<Value> {
    let object = match params.get("object") {
        Some(object) => object,
        None => return Ok(Value::from("get helper error: No object specified.")),
    };
    let key = match params.get_str("key") {
        Some(key) => key,
        None => return Ok(Value::from("get helper error: No key specified.")),
    };
    Ok(object.get(&key).cloned().unwrap_or_default())
}

/// Writes the current value, or the whole context with `key="full"`, as
/// JSON. With `to="console"` the dump is logged instead.
pub fn context_dump(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    _: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    let value = match params.get_str("key").as_deref() {
        Some("full") => ctx.dump(),
        _ => ctx.current().map(|v| v.into_owned()).unwrap_or_default(),
    };
    let dump = serde_json::to_string_pretty(&value)?;
    match params.get_str("to").as_deref() {
        Some("console") => tracing::debug!(target: "dustr::context_dump", "{dump}"),
        _ => chunk.write(&dump),
    }
    Ok(())
}
