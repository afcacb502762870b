//! `{@set}` and `{@unset}`, the only helpers that change the render data.
//!
//! Misuse is reported by writing a message into the output rather than by
//! recording an error.

use crate::helpers::arith::Op;
use crate::render::{Bodies, Chunk, Context, Params};
use crate::value::Map;
use crate::{Result, Value};

/// `{@set key="count" value=1/}` or `{@set key="count" add=1/}`.
pub fn set(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    _: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    let key = match key(params) {
        Ok(key) => key,
        Err(msg) => {
            chunk.write(&format!("set helper error: {msg}"));
            return Ok(());
        }
    };

    if let Some(value) = params.get("value") {
        let inserted = with_root(ctx, |root| {
            root.insert(key, value);
        });
        if let Err(msg) = inserted {
            chunk.write(&format!("set helper error: {msg}"));
        }
        return Ok(());
    }

    let op = match Op::BINARY.into_iter().find(|op| params.has(op.name())) {
        Some(op) => op,
        None => {
            chunk.write("set helper error: No action specified.");
            return Ok(());
        }
    };
    let operand = match params.get(op.name()).filter(|v| v.as_number().is_some()) {
        Some(operand) => operand,
        None => {
            let name = op.name();
            chunk.write(&format!("set helper error: {name} value is not a number."));
            return Ok(());
        }
    };

    let applied = with_root(ctx, |root| {
        let current = root.entry(key).or_insert(Value::Integer(0));
        match op.apply(current, Some(&operand)) {
            Some(result) => {
                *current = result;
                Ok(())
            }
            None => Err(format!("{} failed.", op.name())),
        }
    });
    if let Err(msg) = applied.and_then(|r| r) {
        chunk.write(&format!("set helper error: {msg}"));
    }
    Ok(())
}

/// `{@unset key="count"/}`
pub fn unset(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    _: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    match key(params) {
        Ok(key) => {
            let removed = with_root(ctx, |root| {
                root.remove(&key);
            });
            if let Err(msg) = removed {
                chunk.write(&format!("unset helper error: {msg}"));
            }
        }
        Err(msg) => chunk.write(&format!("unset helper error: {msg}")),
    }
    Ok(())
}

fn key(params: &Params<'_>) -> std::result::Result<String, &'static str> {
    match params.get("key") {
        None | Some(Value::None) => Err("No key specified."),
        Some(Value::String(key)) => Ok(key),
        Some(_) => Err("Key is not a string."),
    }
}

/// Runs `f` on the render data, which becomes a map if it was absent.
fn with_root<T>(
    ctx: &Context<'_>,
    f: impl FnOnce(&mut Map<String, Value>) -> T,
) -> std::result::Result<T, String> {
    let mut root = ctx.root_mut();
    if let Value::None = *root {
        *root = Value::Map(Map::new());
    }
    match &mut *root {
        Value::Map(map) => Ok(f(map)),
        value => Err(format!("Data is not a map, found {}.", value.human())),
    }
}
