//! The scope chain a template is evaluated against.

use std::cell::{Cell, RefCell, RefMut};
use std::collections::BTreeMap;

use crate::types::ast;
use crate::value::{Map, ValueCow};
use crate::Value;

/// State shared by every frame of a single render.
#[derive(Debug)]
pub(crate) struct Scope {
    /// The data passed to the render call. This is the only value that can
    /// be changed during a render, by the `set` and `unset` helpers.
    root: RefCell<Value>,
    /// Values visible from every frame, checked after the chain misses.
    globals: Value,
}

/// A chain of frames, each one borrowing its parent.
///
/// Frames are pushed when entering a section, partial or helper body and
/// dropped when leaving it, so a frame never outlives the frames below it.
#[derive(Debug)]
pub struct Context<'a> {
    scope: &'a Scope,
    head: Head<'a>,
    parent: Option<&'a Context<'a>>,
    iteration: Option<Iteration>,
    blocks: Option<&'a BTreeMap<String, ast::Body>>,
    select: Option<&'a Select>,
}

#[derive(Debug)]
enum Head<'a> {
    /// The render data, stored in the [`Scope`].
    Root,
    /// A pushed value.
    Value(ValueCow<'a>),
    /// A frame that only carries metadata, lookups pass straight through.
    Transparent,
}

/// The position of the current element in an iterated section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iteration {
    /// The 0-based index of the element, exposed as `$idx`.
    pub index: usize,
    /// The number of elements, exposed as `$len`.
    pub len: usize,
}

/// The state of a `{@select}` block, shared with the comparisons inside it.
#[derive(Debug)]
pub struct Select {
    key: Value,
    resolved: Cell<bool>,
}

enum Lookup<'k> {
    Name(&'k str),
    Owned(String),
    Index(usize),
}

impl Scope {
    pub fn new(root: Value, globals: Value) -> Self {
        Self {
            root: RefCell::new(root),
            globals,
        }
    }
}

impl<'a> Context<'a> {
    /// Construct the root frame of a render.
    pub(crate) fn root(scope: &'a Scope) -> Self {
        Self {
            scope,
            head: Head::Root,
            parent: None,
            iteration: None,
            blocks: None,
            select: None,
        }
    }

    fn child<'b>(&'b self, head: Head<'b>) -> Context<'b> {
        Context {
            scope: self.scope,
            head,
            parent: Some(self),
            iteration: None,
            blocks: None,
            select: None,
        }
    }

    /// Push a new frame with the given value.
    pub fn push<'b>(&'b self, value: ValueCow<'b>) -> Context<'b> {
        self.child(Head::Value(value))
    }

    /// Push a new frame for one element of an iterated section.
    pub fn push_iteration<'b>(&'b self, value: ValueCow<'b>, iteration: Iteration) -> Context<'b> {
        let mut ctx = self.child(Head::Value(value));
        ctx.iteration = Some(iteration);
        ctx
    }

    /// Push a frame declaring block overrides.
    pub(crate) fn push_blocks<'b>(
        &'b self,
        blocks: &'b BTreeMap<String,
        ast::Body>,
    ) -> Context<'b> {
        let mut ctx = self.child(Head::Transparent);
        ctx.blocks = Some(blocks);
        ctx
    }

    /// Push a frame carrying `select` state.
    pub fn push_select<'b>(&'b self, select: &'b Select) -> Context<'b> {
        let mut ctx = self.child(Head::Transparent);
        ctx.select = Some(select);
        ctx
    }

    /// Resolves a path.
    ///
    /// The first key of a relative path is searched for in the current
    /// frame, then in each parent in turn and finally in the globals. A path
    /// starting with `.` only consults the current frame. Missing values are
    /// `None`, never an error.
    pub fn get(&self, path: &ast::Path) -> Option<ValueCow<'_>> {
        let (first, rest) = match path.keys.split_first() {
            Some(split) => split,
            None => return self.current(),
        };
        let first = self.lookup_key(first)?;
        let mut value = match path.anchor {
            ast::Anchor::Current => self.current()?.lookup(|v| index(v, &first))?,
            ast::Anchor::Relative => self.find(&first)?,
        };
        for key in rest {
            let key = self.lookup_key(key)?;
            value = value.lookup(|v| index(v, &key))?;
        }
        Some(value)
    }

    /// Resolves a dotted path given as a string, e.g. `user.name`.
    pub fn get_dotted(&self, path: &str) -> Option<ValueCow<'_>> {
        let mut keys = path.split('.');
        let mut value = self.find(&Lookup::Name(keys.next()?))?;
        for key in keys {
            value = value.lookup(|v| v.get(key))?;
        }
        Some(value)
    }

    /// Returns the value of the nearest frame that holds one, `{.}`.
    pub fn current(&self) -> Option<ValueCow<'_>> {
        let mut ctx: &Context<'_> = self;
        loop {
            match &ctx.head {
                Head::Root => return Some(ValueCow::Owned(ctx.scope.root.borrow().clone())),
                Head::Value(v) => return Some(ValueCow::Borrowed(v)),
                Head::Transparent => ctx = ctx.parent?,
            }
        }
    }

    /// Returns the nearest override for the named block.
    pub fn get_block(&self, name: &str) -> Option<&ast::Body> {
        self.frames().find_map(|ctx| ctx.blocks?.get(name))
    }

    /// Returns the position in the nearest iterated section.
    pub fn iteration(&self) -> Option<Iteration> {
        self.frames().find_map(|ctx| ctx.iteration)
    }

    /// Returns the state of the nearest enclosing `{@select}`.
    pub fn select(&self) -> Option<&Select> {
        self.frames().find_map(|ctx| ctx.select)
    }

    /// Mutable access to the render data.
    ///
    /// # Panics
    ///
    /// If called while another borrow of the root is alive, which does not
    /// happen as lookups clone out of the root.
    pub fn root_mut(&self) -> RefMut<'_, Value> {
        self.scope.root.borrow_mut()
    }

    /// Returns a snapshot of the whole chain, innermost first, for debugging.
    pub fn dump(&self) -> Value {
        let mut stack = Value::None;
        let frames: Vec<_> = self.frames().collect();
        for ctx in frames.into_iter().rev() {
            let head = match &ctx.head {
                Head::Root => ctx.scope.root.borrow().clone(),
                Head::Value(v) => Value::clone(v),
                Head::Transparent => continue,
            };
            let mut frame = Map::new();
            frame.insert("head".to_owned(), head);
            frame.insert("tail".to_owned(), stack);
            stack = Value::Map(frame);
        }
        let mut full = Map::new();
        full.insert("stack".to_owned(), stack);
        full.insert("globals".to_owned(), self.scope.globals.clone());
        Value::Map(full)
    }

    fn frames(&self) -> impl Iterator<Item = &Context<'_>> {
        std::iter::successors(Some(self), |ctx| ctx.parent)
    }

    fn find(&self, key: &Lookup<'_>) -> Option<ValueCow<'_>> {
        if let Lookup::Name(name) = key {
            if let Some(v) = self.special(name) {
                return Some(ValueCow::Owned(v));
            }
        }
        for ctx in self.frames() {
            let found = match &ctx.head {
                Head::Root => index(&ctx.scope.root.borrow(), key).cloned().map(ValueCow::Owned),
                Head::Value(v) => index(v, key).map(ValueCow::Borrowed),
                Head::Transparent => None,
            };
            if found.is_some() {
                return found;
            }
        }
        index(&self.scope.globals, key).map(ValueCow::Borrowed)
    }

    /// Resolves `$idx`, `$len`, `$iter` and `$key` in iterated sections.
    fn special(&self, name: &str) -> Option<Value> {
        if !name.starts_with('$') {
            return None;
        }
        let it = self.iteration()?;
        match name {
            "$idx" | "$key" => Some(Value::from(it.index)),
            "$len" => Some(Value::from(it.len)),
            "$iter" => Some(Value::from(it.index + 1)),
            _ => None,
        }
    }

    fn lookup_key<'k>(&self, key: &'k ast::Key) -> Option<Lookup<'k>> {
        match key {
            ast::Key::Name(name) => Some(Lookup::Name(name)),
            ast::Key::Index(i) => Some(Lookup::Index(*i)),
            ast::Key::Expr(path) => match &*self.get(path)? {
                Value::Integer(i) => usize::try_from(*i).ok().map(Lookup::Index),
                Value::String(s) => Some(Lookup::Owned(s.clone())),
                _ => None,
            },
        }
    }
}

fn index<'v>(value: &'v Value, key: &Lookup<'_>) -> Option<&'v Value> {
    match key {
        Lookup::Name(name) => value.get(name),
        Lookup::Owned(name) => value.get(name),
        Lookup::Index(i) => value.get_index(*i),
    }
}

impl Select {
    pub fn new(key: Value) -> Self {
        Self {
            key,
            resolved: Cell::new(false),
        }
    }

    /// The value comparisons default to when they have no `key`.
    pub fn key(&self) -> &Value {
        &self.key
    }

    /// Whether a comparison inside the select already matched.
    pub fn is_resolved(&self) -> bool {
        self.resolved.get()
    }

    pub fn resolve(&self) {
        self.resolved.set(true);
    }
}
