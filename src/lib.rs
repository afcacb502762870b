//! A Dust template engine.
//!
//! # Features
//!
//! ### Syntax
//!
//! - References with filters: `{user.name}`, `{bio|s}`, `{list[$idx]|js}`
//! - Sections that iterate or test data: `{#users}{name}{:else}none{/users}`
//! - Existence tests: `{?admin}...{/admin}`, `{^admin}...{/admin}`
//! - Partials with context and parameters: `{>"cards/{kind}" title=name/}`
//! - Blocks and inline partials for layouts: `{+title}Default{/title}`,
//!   `{<title}Home{/title}`
//! - Helpers: `{@eq key=a value=1}yes{:else}no{/eq}`
//! - Comments, raw text and specials: `{! note !}`, `` {`{raw}`} ``, `{~n}`
//!
//! ### Engine
//!
//! - Render any [`serde`] serializable data
//! - Automatic HTML escaping, suppressed per reference with `|s`
//! - The standard Dust helpers, plus your own [`Helper`]s and filters
//! - Template files loaded on demand from configured directories
//! - Errors with the location in the template source
//!
//! # Getting started
//!
//! Your entry point is the [`Engine`] struct. The engine stores the
//! registered helpers, filters and templates. Generally, you only need to
//! construct one engine during the lifetime of a program.
//!
//! ```
//! let engine = dustr::Engine::new();
//! ```
//!
//! Next, [`.add_template`][Engine::add_template] is used to compile and store
//! a template in the engine.
//!
//! ```
//! # let engine = dustr::Engine::new();
//! engine.add_template("hello", "Hello {user.name}!")?;
//! # Ok::<(), dustr::Error>(())
//! ```
//!
//! Finally, the template is rendered by name.
//!
//! ```
//! # let engine = dustr::Engine::new();
//! # engine.add_template("hello", "Hello {user.name}!")?;
//! let result = engine.render("hello", dustr::value! { user: { name: "John Smith" } })?;
//! assert_eq!(result, "Hello John Smith!");
//! # Ok::<(), dustr::Error>(())
//! ```
//!
//! # Examples
//!
//! ### Render using structured data
//!
//! ```
//! #[derive(serde::Serialize)]
//! struct Context { users: Vec<User> }
//!
//! #[derive(serde::Serialize)]
//! struct User { name: String }
//!
//! let ctx = Context {
//!     users: vec![User { name: "Ann".into() }, User { name: "Bob".into() }],
//! };
//!
//! let engine = dustr::Engine::new();
//! let template = engine.compile("{#users}{name}{@sep}, {/sep}{/users}")?;
//! let result = engine.render_template(&template, &ctx)?;
//!
//! assert_eq!(result, "Ann, Bob");
//! # Ok::<(), dustr::Error>(())
//! ```
//!
//! ### Transform data using filters
//!
//! ```
//! use dustr::Value;
//!
//! let mut engine = dustr::Engine::new();
//! engine.add_filter("upper", |v: Value| Value::from(v.to_string().to_uppercase()));
//!
//! let template = engine.compile("Hello {value|upper}")?;
//! let result = engine.render_template(&template, dustr::value! { value: "world!" })?;
//!
//! assert_eq!(result, "Hello WORLD!");
//! # Ok::<(), dustr::Error>(())
//! ```
//!
//! ### Load templates from disk
//!
//! Names that are not registered are resolved to `.dust` files, either as a
//! path or by searching the directories added with
//! [`.add_directory`][Engine::add_directory].
//!
//! ```no_run
//! let mut engine = dustr::Engine::new();
//! engine.add_directory("views");
//!
//! // renders e.g. views/pages/home.dust, which may include `{>header/}`
//! let result = engine.render("pages/home", dustr::value! { title: "Home" })?;
//! # Ok::<(), dustr::Error>(())
//! ```

mod compile;
mod error;
mod filters;
mod helpers;
mod loader;
mod macros;
mod render;
mod types;
mod value;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

pub use crate::compile::Whitespace;
pub use crate::error::{Error, ErrorKind};
pub use crate::helpers::Helper;
pub use crate::render::{Bodies, Chunk, Context, Iteration, Params, Rendered, Renderer, Select};
pub use crate::types::ast::{Body, Template};
pub use crate::value::{to_value, List, Map, Value, ValueCow};

use crate::filters::FilterFn;
use crate::loader::Loader;
use crate::render::core::RendererImpl;
use crate::render::RenderSettings;

/// A type alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A function that returns the source of a template by name.
pub type TemplateFn = dyn Fn(&str) -> Option<String> + Send + Sync + 'static;

/// The compilation and rendering engine.
pub struct Engine {
    templates: RwLock<BTreeMap<String, Arc<Template>>>,
    pub(crate) helpers: BTreeMap<String, Helper>,
    pub(crate) filters: BTreeMap<String, Box<FilterFn>>,
    pub(crate) automatic_filters: Vec<String>,
    pub(crate) max_include_depth: usize,
    loader: Loader,
    template_fn: Option<Box<TemplateFn>>,
    whitespace: Whitespace,
}

impl Default for Engine {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Construct a new engine with the builtin helpers and filters.
    pub fn new() -> Self {
        let mut helpers = BTreeMap::new();
        helpers::builtins(&mut helpers);
        let mut filters = BTreeMap::new();
        filters::builtins(&mut filters);
        Self {
            templates: RwLock::new(BTreeMap::new()),
            helpers,
            filters,
            automatic_filters: vec!["h".to_owned()],
            max_include_depth: 64,
            loader: Loader::default(),
            template_fn: None,
            whitespace: Whitespace::default(),
        }
    }

    /// Set how whitespace in template text is treated by the compiler.
    ///
    /// Only affects templates compiled after this call.
    #[inline]
    pub fn set_whitespace(&mut self, whitespace: Whitespace) {
        self.whitespace = whitespace;
    }

    /// Set the maximum number of nested partials.
    ///
    /// Defaults to 64. Can be overridden per render using
    /// [`Renderer::with_max_include_depth`].
    #[inline]
    pub fn set_max_include_depth(&mut self, depth: usize) {
        self.max_include_depth = depth;
    }

    /// Set the filters applied to every reference after its own filters.
    ///
    /// Defaults to `["h"]`. A reference with the `s` filter skips them.
    pub fn set_automatic_filters<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.automatic_filters.clear();
        for name in names {
            let name = name.into();
            if !self.automatic_filters.contains(&name) {
                self.automatic_filters.push(name);
            }
        }
    }

    /// Add a new filter to the engine, replacing any with the same name.
    #[inline]
    pub fn add_filter<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Box::new(f));
    }

    /// Add a new helper to the engine, replacing any with the same name.
    #[inline]
    pub fn add_helper(&mut self, name: impl Into<String>, helper: Helper) {
        self.helpers.insert(name.into(), helper);
    }

    /// Add a directory to search for template files.
    ///
    /// See [`.load_template`][Engine::load_template].
    pub fn add_directory(&mut self, dir: impl Into<PathBuf>) {
        self.loader.add_directory(dir.into());
    }

    /// Set a function to supply template sources by name.
    ///
    /// It is consulted for names that are not registered, before looking
    /// for files. Sources it returns are compiled and registered under the
    /// name.
    pub fn set_template_loader<F>(&mut self, f: F)
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.template_fn = Some(Box::new(f));
    }

    /// Compile a template without storing it in the engine.
    #[inline]
    pub fn compile(&self, source: &str) -> Result<Template> {
        compile::template(source, self.whitespace)
    }

    /// Compile a template and store it under the given name.
    pub fn add_template(&self, name: &str, source: &str) -> Result<Arc<Template>> {
        let template = self
            .compile(source)
            .map_err(|err| err.with_template_name(name))?;
        Ok(self.register(name, template))
    }

    /// Store a compiled template under the given name, replacing any
    /// existing template with that name.
    pub fn register(&self, name: &str, template: Template) -> Arc<Template> {
        debug!(name, "registering template");
        let template = Arc::new(template);
        self.templates
            .write()
            .insert(name.to_owned(), Arc::clone(&template));
        template
    }

    /// Lookup a registered template by name.
    #[inline]
    pub fn get_template(&self, name: &str) -> Option<Arc<Template>> {
        self.templates.read().get(name).cloned()
    }

    /// Compile a template file.
    ///
    /// The `.dust` extension is added if missing and the path is resolved
    /// the same way as in [`.load_template`][Engine::load_template]. The
    /// template is registered under its canonical path, a file that was
    /// already compiled is not read again. Returns `None` if no file was
    /// found.
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<Option<Arc<Template>>> {
        let name = path.as_ref().to_string_lossy();
        match self.loader.resolve(&name, None) {
            Some(path) => self.load_file(&path).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the template with the given name, compiling it on demand.
    ///
    /// A name is looked up in the registry, then passed to the template
    /// loader if one is set, and finally resolved to a `.dust` file: as a
    /// path, and otherwise by searching the added directories for a file
    /// whose path ends with the name.
    #[inline]
    pub fn load_template(&self, name: &str) -> Result<Option<Arc<Template>>> {
        self.load_partial(name, None)
    }

    /// Like `load_template` but relative paths are tried against `base`
    /// first, the directory of the including template.
    pub(crate) fn load_partial(
        &self,
        name: &str,
        base: Option<&Path>,
    ) -> Result<Option<Arc<Template>>> {
        if let Some(template) = self.get_template(name) {
            return Ok(Some(template));
        }
        if let Some(template_fn) = &self.template_fn {
            if let Some(source) = template_fn(name) {
                return self.add_template(name, &source).map(Some);
            }
        }
        match self.loader.resolve(name, base) {
            Some(path) => self.load_file(&path).map(Some),
            None => Ok(None),
        }
    }

    fn load_file(&self, path: &Path) -> Result<Arc<Template>> {
        let name = path.to_string_lossy();
        if let Some(template) = self.get_template(&name) {
            return Ok(template);
        }
        debug!(path = %path.display(), "compiling template file");
        let source = fs::read_to_string(path).map_err(|err| Error::io(err, path))?;
        let mut template = self
            .compile(&source)
            .map_err(|err| err.with_template_name(&name))?;
        template.path = Some(path.to_path_buf());
        Ok(self.register(&name, template))
    }

    /// Render the named template.
    ///
    /// Fails if the template cannot be found or if an error was recorded
    /// while rendering.
    pub fn render<S>(&self, name: &str, data: S) -> Result<String>
    where
        S: Serialize,
    {
        let template = self
            .load_template(name)?
            .ok_or_else(|| Error::new(format!("template `{name}` not found")))?;
        self.renderer(&template, data).with_name(name).to_string()
    }

    /// Render a compiled template.
    #[inline]
    pub fn render_template<S>(&self, template: &Template, data: S) -> Result<String>
    where
        S: Serialize,
    {
        self.renderer(template, data).to_string()
    }

    /// Returns a [`Renderer`] for configuring a render of the template.
    ///
    /// # Examples
    ///
    /// ```
    /// let engine = dustr::Engine::new();
    /// let template = engine.compile("{greeting} {name}{missing}")?;
    /// let result = engine
    ///     .renderer(&template, dustr::value! { name: "World" })
    ///     .with_globals(dustr::value! { greeting: "Hello" })
    ///     .to_string()?;
    /// assert_eq!(result, "Hello World");
    /// # Ok::<(), dustr::Error>(())
    /// ```
    #[inline]
    pub fn renderer<'a, S>(&'a self, template: &'a Template, data: S) -> Renderer<'a>
    where
        S: Serialize,
    {
        Renderer::new(self, template, data)
    }

    /// Serialize all registered templates to JSON.
    pub fn serialize_templates(&self) -> Result<String> {
        let templates = self.templates.read();
        let templates: BTreeMap<&str, &Template> = templates
            .iter()
            .map(|(name, template)| (name.as_str(), &**template))
            .collect();
        Ok(serde_json::to_string(&templates)?)
    }

    /// Register templates previously serialized with
    /// [`.serialize_templates`][Engine::serialize_templates].
    pub fn deserialize_templates(&self, json: &str) -> Result<()> {
        let templates: BTreeMap<String, Template> = serde_json::from_str(json)?;
        debug!(count = templates.len(), "registering serialized templates");
        self.templates.write().extend(
            templates
                .into_iter()
                .map(|(name, template)| (name, Arc::new(template))),
        );
        Ok(())
    }

    /// Returns the names of the helpers used by the named template and,
    /// recursively, by the partials it includes by static name.
    pub fn helpers_used(&self, name: &str) -> Result<Vec<String>> {
        let mut used = Vec::new();
        self.walk(name, None, &mut BTreeSet::new(), &mut |template: &Template| {
            for helper in template.helpers() {
                if !used.iter().any(|h| h == helper) {
                    used.push(helper.to_owned());
                }
            }
        })?;
        Ok(used)
    }

    /// Runs the [`Prerun`][Helper::Prerun] helpers used by the named
    /// templates, and the partials they include, without rendering anything.
    ///
    /// Parameters are resolved against empty data. Returns the names of the
    /// helpers that ran.
    pub fn prerun_helpers(&self, names: &[&str]) -> Result<Vec<String>> {
        let renderer = RendererImpl {
            engine: self,
            settings: RenderSettings {
                max_include_depth: self.max_include_depth,
            },
        };
        let mut ran = Vec::new();
        let mut seen = BTreeSet::new();
        for name in names {
            self.walk(name, None, &mut seen, &mut |template: &Template| {
                renderer.prerun(template, &mut ran);
            })?;
        }
        Ok(ran)
    }

    fn walk<F>(
        &self,
        name: &str,
        base: Option<&Path>,
        seen: &mut BTreeSet<String>,
        f: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&Template),
    {
        if !seen.insert(name.to_owned()) {
            return Ok(());
        }
        let template = match self.load_partial(name, base)? {
            Some(template) => template,
            None => return Ok(()),
        };
        f(&*template);
        let base = template.path().and_then(Path::parent);
        for partial in template.partials() {
            self.walk(partial, base, seen, f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("templates", &self.templates.read().keys())
            .field("helpers", &self.helpers.keys())
            .field("filters", &self.filters.keys())
            .field("automatic_filters", &self.automatic_filters)
            .field("max_include_depth", &self.max_include_depth)
            .field("whitespace", &self.whitespace)
            .finish_non_exhaustive()
    }
}
