use crate::helpers::arith::Op;
use crate::render::{Bodies, Chunk, Context, Params, Select};
use crate::value::ValueCow;
use crate::{Error, Result, Value};

/// `{@math key=x add=3/}` or `{@math key=x method="add" operand=3/}`.
///
/// Without a body the result is written. With a body the result becomes the
/// current value and the select key for nested comparisons.
pub fn math(
    chunk: &mut Chunk<'_>,
    ctx: &Context<'_>,
    bodies: &Bodies<'_>,
    params: &Params<'_>,
) -> Result<()> {
    let key = params
        .get("key")
        .ok_or_else(|| Error::new("math requires a `key` parameter"))?;
    let key = match key {
        Value::String(name) if params.is_literal_str("key") && key_is_name(&name) => {
            match ctx.get_dotted(&name) {
                Some(value) => value.into_owned(),
                None => Value::String(name),
            }
        }
        key => key,
    };

    let (op, operand) = match params.get_str("method") {
        Some(method) => {
            let op = Op::from_name(&method)
                .ok_or_else(|| Error::new(format!("math method `{method}` is not supported")))?;
            (op, params.get("operand"))
        }
        None => {
            let op = Op::ALL
                .into_iter()
                .find(|op| params.has(op.name()))
                .ok_or_else(|| Error::new("math requires a method"))?;
            (op, params.get(op.name()))
        }
    };

    let result = op.apply(&key, operand.as_ref()).ok_or_else(|| {
        Error::new(format!(
            "math {} failed, operands must be numbers and not divide by zero",
            op.name()
        ))
    })?;

    if bodies.has_block() {
        let select = Select::new(result.clone());
        let ctx = ctx.push(ValueCow::Owned(result));
        let ctx = ctx.push_select(&select);
        chunk.render(bodies.block(), &ctx);
    } else {
        chunk.write_display(&result);
    }
    Ok(())
}

/// Whether a string key looks like a reference rather than a number.
fn key_is_name(s: &str) -> bool {
    s.parse::<f64>().is_err()
        && s.chars().next().map_or(false, |c| c.is_alphabetic() || c == '_' || c == '$')
}
