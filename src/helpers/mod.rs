//! Helpers are the `{@name ...}` tags, functions that control how their
//! bodies are rendered.

#[cfg(feature = "builtins")]
mod arith;
#[cfg(feature = "builtins")]
mod compare;
#[cfg(feature = "builtins")]
mod math;
#[cfg(feature = "builtins")]
mod misc;
#[cfg(feature = "builtins")]
mod set;

use std::collections::BTreeMap;
use std::fmt;

use crate::render::{Bodies, Chunk, Context, Params};
use crate::{Result, Value};

pub type InitFn = dyn Fn(&mut Chunk<'_>, &Context<'_>, &Bodies<'_>, &Params<'_>) -> Result<()>
    + Send
    + Sync
    + 'static;

pub type OutputFn = dyn Fn(&Context<'_>, &Params<'_>) -> Result<Value> + Send + Sync + 'static;

pub type PrerunFn = dyn Fn(&Context<'_>, &Params<'_>) + Send + Sync + 'static;

/// A function called for a `{@name ...}` tag.
///
/// # Examples
///
/// ```
/// use dustr::{Engine, Helper, Value};
///
/// let mut engine = Engine::new();
/// engine.add_helper(
///     "upper",
///     Helper::init(|chunk, ctx, bodies, _params| {
///         let mut inner = chunk.fork();
///         inner.render(bodies.block(), ctx);
///         chunk.write(&inner.into_output().to_uppercase());
///         Ok(())
///     }),
/// );
/// engine.add_helper(
///     "greet",
///     Helper::output(|_ctx, params| {
///         let name = params.get_str("name").unwrap_or_default();
///         Ok(Value::from(format!("Hello {name}!")))
///     }),
/// );
///
/// let result = engine
///     .render_template(&engine.compile("{@upper}a{/upper} {@greet name=\"World\"/}")?, ())?;
/// assert_eq!(result, "A Hello World!");
/// # Ok::<(), dustr::Error>(())
/// ```
pub enum Helper {
    /// Runs only when probing a template with
    /// [`Engine::prerun_helpers`][crate::Engine::prerun_helpers].
    Prerun(Box<PrerunFn>),
    /// Gets full control over the chunk, the context and the bodies.
    Init(Box<InitFn>),
    /// Returns a value that is written unescaped.
    Output(Box<OutputFn>),
}

impl Helper {
    pub fn init<F>(f: F) -> Self
    where
        F: Fn(&mut Chunk<'_>, &Context<'_>, &Bodies<'_>, &Params<'_>) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        Self::Init(Box::new(f))
    }

    pub fn output<F>(f: F) -> Self
    where
        F: Fn(&Context<'_>, &Params<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        Self::Output(Box::new(f))
    }

    pub fn prerun<F>(f: F) -> Self
    where
        F: Fn(&Context<'_>, &Params<'_>) + Send + Sync + 'static,
    {
        Self::Prerun(Box::new(f))
    }
}

impl fmt::Debug for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Prerun(_) => "Prerun",
            Self::Init(_) => "Init",
            Self::Output(_) => "Output",
        };
        write!(f, "{kind}(..)")
    }
}

/// Registers the builtin helpers.
#[cfg(feature = "builtins")]
pub(crate) fn builtins(helpers: &mut BTreeMap<String, Helper>) {
    let mut add = |name: &str, helper| {
        helpers.insert(name.to_owned(), helper);
    };
    add("eq", Helper::init(compare::eq));
    add("ne", Helper::init(compare::ne));
    add("not", Helper::init(compare::ne));
    add("lt", Helper::init(compare::lt));
    add("lte", Helper::init(compare::lte));
    add("gt", Helper::init(compare::gt));
    add("gte", Helper::init(compare::gte));
    add("select", Helper::init(compare::select));
    add("any", Helper::init(compare::any));
    add("none", Helper::init(compare::none));
    add("math", Helper::init(math::math));
    add("first", Helper::init(misc::first));
    add("last", Helper::init(misc::last));
    add("sep", Helper::init(misc::sep));
    add("if", Helper::init(misc::if_));
    add("default", Helper::init(misc::default));
    add("size", Helper::output(misc::size));
    add("get", Helper::output(misc::get));
    add("contextDump", Helper::init(misc::context_dump));
    add("set", Helper::init(set::set));
    add("unset", Helper::init(set::unset));
}

#[cfg(not(feature = "builtins"))]
pub(crate) fn builtins(_: &mut BTreeMap<String, Helper>) {}
