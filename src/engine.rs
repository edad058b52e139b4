//! Template resolver and render entry point
//!
//! The engine owns the namespace cache and the registered hook tables.
//! Rendering a named template compiles its namespace on first use (via the
//! injected finder, or from data registered with [`Engine::add_custom`])
//! into a [`RenderCollection`] of deferred renderers, then hands the
//! collection to a caller-supplied callback. The engine itself never
//! substitutes anything; substitution happens when the callback invokes
//! leaf renderers.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::collection::{Node, RenderCollection, RenderContext, Renderer};
use crate::config::EngineConfig;
use crate::error::RenderError;
use crate::escape::{DefaultEscaper, Escaper};
use crate::finder::{DirFinder, TemplateFinder};
use crate::substitute;
use crate::translate::{IdentityTranslator, Translator};
use crate::value::{Args, Value};

/// Engine-wide hook that post-processes (or synthesizes) the value destined
/// for one placeholder name across all templates
pub type CustomParamFn =
    Rc<dyn Fn(Option<&Value>, &RenderContext<'_>) -> Result<Value, RenderError>>;

/// Pre-processing hook for one attribute name's value
pub type AttrHookFn = Rc<dyn Fn(&str) -> String>;

/// Composes one attribute name/value pair into markup syntax
pub type ComposerFn = Rc<dyn Fn(&str, &str) -> String>;

/// Stringify override consulted before the built-in canonical forms
pub type StringifyFn = Rc<dyn Fn(&Value) -> Option<String>>;

/// Template resolver and render entry point
pub struct Engine {
    cache: HashMap<String, RenderCollection>,
    finder: Option<Box<dyn TemplateFinder>>,
    escaper: Box<dyn Escaper>,
    translator: Box<dyn Translator>,
    custom_params: IndexMap<String, CustomParamFn>,
    attr_hooks: IndexMap<String, AttrHookFn>,
    attr_composer: ComposerFn,
    stringify_hook: Option<StringifyFn>,
    config: EngineConfig,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with no file finder
    ///
    /// Only namespaces registered through [`Engine::add_custom`] can be
    /// rendered; any other name fails with `TemplateNotFound`.
    pub fn new() -> Self {
        let mut attr_hooks: IndexMap<String, AttrHookFn> = IndexMap::new();
        attr_hooks.insert("id".to_string(), Rc::new(|value: &str| normalize_id(value)));

        Self {
            cache: HashMap::new(),
            finder: None,
            escaper: Box::new(DefaultEscaper),
            translator: Box::new(IdentityTranslator),
            custom_params: IndexMap::new(),
            attr_hooks,
            attr_composer: Rc::new(|name: &str, value: &str| format!(r#"{}="{}""#, name, value)),
            stringify_hook: None,
            config: EngineConfig::default(),
        }
    }

    /// Create an engine resolving templates under a directory root
    ///
    /// Fails with `InvalidConfiguration` if the root does not exist.
    pub fn with_root(root: impl Into<PathBuf>) -> Result<Self, RenderError> {
        Self::with_root_and_config(root, EngineConfig::default())
    }

    /// Create an engine resolving templates under a directory root, with a
    /// non-default configuration
    ///
    /// The finder indexes the extensions named by
    /// `config.template_extensions`, so this is the constructor to use
    /// when template files are not `.toml`.
    pub fn with_root_and_config(
        root: impl Into<PathBuf>,
        config: EngineConfig,
    ) -> Result<Self, RenderError> {
        let mut engine = Self::new().with_config(config);
        let finder =
            DirFinder::new(root)?.with_extensions(engine.config.template_extensions.clone());
        engine.finder = Some(Box::new(finder));
        Ok(engine)
    }

    /// Create an engine with a custom template finder
    pub fn with_finder(finder: impl TemplateFinder + 'static) -> Self {
        let mut engine = Self::new();
        engine.finder = Some(Box::new(finder));
        engine
    }

    /// Replace the escaper capability
    pub fn with_escaper(mut self, escaper: impl Escaper + 'static) -> Self {
        self.escaper = Box::new(escaper);
        self
    }

    /// Replace the translator capability
    pub fn with_translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translator = Box::new(translator);
        self
    }

    /// Replace the engine configuration
    ///
    /// An already-constructed finder keeps its extension filter; use
    /// [`Engine::with_root_and_config`] to build a directory finder over a
    /// non-default extension set.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set a stringify override for argument values
    pub fn with_stringify<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + 'static,
    {
        self.stringify_hook = Some(Rc::new(hook));
        self
    }

    /// Replace the attribute composer
    pub fn with_attribute_composer<F>(mut self, composer: F) -> Self
    where
        F: Fn(&str, &str) -> String + 'static,
    {
        self.attr_composer = Rc::new(composer);
        self
    }

    /// Register a value pre-processing hook for one attribute name
    pub fn add_attribute_hook<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: Fn(&str) -> String + 'static,
    {
        self.attr_hooks.insert(name.into(), Rc::new(hook));
    }

    /// Render a named template through a callback
    ///
    /// The namespace is compiled on first use. The callback receives the
    /// invocation context and produces the output; `Ok(None)` renders as
    /// the empty string.
    pub fn render<F>(&mut self, name: &str, callback: F) -> Result<String, RenderError>
    where
        F: FnOnce(&RenderContext<'_>) -> Result<Option<String>, RenderError>,
    {
        self.ensure_compiled(name)?;
        let collection = self
            .cache
            .get(name)
            .ok_or_else(|| RenderError::TemplateNotFound { name: name.to_string() })?;
        let ctx = RenderContext {
            collection,
            engine: &*self,
            namespace: name,
        };
        Ok(callback(&ctx)?.unwrap_or_default())
    }

    /// Compile-through accessor for a namespace's collection
    pub fn get_collection(&mut self, name: &str) -> Result<&RenderCollection, RenderError> {
        self.ensure_compiled(name)?;
        self.cache
            .get(name)
            .ok_or_else(|| RenderError::TemplateNotFound { name: name.to_string() })
    }

    /// Register raw template data under a namespace, bypassing the finder
    ///
    /// Data registered for an already-compiled namespace merges into it:
    /// nested maps merge key-by-key, scalar leaves overwrite. Repeating
    /// the same registration is a no-op.
    pub fn add_custom(&mut self, namespace: &str, templates: Value) -> Result<(), RenderError> {
        let mut compiled = RenderCollection::from_value(templates)?;
        compile_leaves(&mut compiled, namespace);
        debug!(namespace, parts = compiled.len(), "registered custom templates");
        match self.cache.entry(namespace.to_string()) {
            Entry::Occupied(mut slot) => slot.get_mut().merge(compiled),
            Entry::Vacant(slot) => {
                slot.insert(compiled);
            }
        }
        Ok(())
    }

    /// Compile a single value into a renderer without touching the cache
    pub fn make_render(&self, value: Value, namespace: Option<&str>) -> Renderer {
        let namespace = namespace.unwrap_or("").to_string();
        match value {
            Value::Deferred(f) => Renderer::Custom { f, namespace },
            other => Renderer::Format {
                template: other.canonical_text(),
                namespace,
            },
        }
    }

    /// Compile raw template data into a collection without touching the
    /// cache — for ad hoc, throwaway rendering contexts
    pub fn make_render_collection(
        &self,
        templates: Value,
        namespace: Option<&str>,
    ) -> Result<RenderCollection, RenderError> {
        let namespace = namespace.unwrap_or("");
        let mut collection = RenderCollection::from_value(templates)?;
        compile_leaves(&mut collection, namespace);
        Ok(collection)
    }

    /// Build an invocation context over an uncached collection
    pub fn context<'a>(
        &'a self,
        collection: &'a RenderCollection,
        namespace: &'a str,
    ) -> RenderContext<'a> {
        RenderContext {
            collection,
            engine: self,
            namespace,
        }
    }

    /// Register a custom parameter callback for one placeholder name
    pub fn add_custom_param_callback<F>(&mut self, name: impl Into<String>, callback: F)
    where
        F: Fn(Option<&Value>, &RenderContext<'_>) -> Result<Value, RenderError> + 'static,
    {
        self.custom_params.insert(name.into(), Rc::new(callback));
    }

    /// Remove a custom parameter callback, reporting whether one existed
    pub fn remove_custom_param_callback(&mut self, name: &str) -> bool {
        self.custom_params.shift_remove(name).is_some()
    }

    /// Substitute named placeholders in a format string
    ///
    /// Deferred argument values are invoked with the namespace context,
    /// everything else goes through the stringify policy, registered
    /// custom parameter callbacks are applied (and, by default, injected
    /// for registered names the caller omitted), then the placeholder
    /// engine runs.
    pub fn substitute(
        &self,
        format: &str,
        args: &Args,
        ctx: &RenderContext<'_>,
    ) -> Result<String, RenderError> {
        let mut resolved: IndexMap<String, String> = IndexMap::new();
        for (key, value) in args {
            let text = match self.custom_params.get(key) {
                Some(callback) => {
                    // Callbacks see resolved strings, never raw callables
                    let value = match value {
                        Value::Deferred(_) => Value::Str(self.stringify(value, ctx)?),
                        other => other.clone(),
                    };
                    let transformed = callback(Some(&value), ctx)?;
                    self.stringify(&transformed, ctx)?
                }
                None => self.stringify(value, ctx)?,
            };
            resolved.insert(key.clone(), text);
        }
        if self.config.inject_registered_params {
            for (name, callback) in &self.custom_params {
                if !resolved.contains_key(name) {
                    let injected = callback(None, ctx)?;
                    resolved.insert(name.clone(), self.stringify(&injected, ctx)?);
                }
            }
        }
        Ok(substitute::vnsprintf(format, &resolved))
    }

    /// Stringify an argument value
    ///
    /// Deferred values are invoked with the context and no arguments; the
    /// stringify hook, if set, is consulted next; the canonical text form
    /// is the fallback.
    pub fn stringify(&self, value: &Value, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        if let Value::Deferred(f) = value {
            return f(ctx, &Args::new());
        }
        if let Some(hook) = &self.stringify_hook {
            if let Some(text) = hook(value) {
                return Ok(text);
            }
        }
        Ok(value.canonical_text())
    }

    /// Compose an attribute string from a name/value map
    ///
    /// Deferred values are resolved, the per-name hook and the sensitive
    /// escaping are applied, pairs are composed and joined with single
    /// spaces. An empty map yields the empty string.
    pub fn attributes(&self, args: &Args) -> Result<String, RenderError> {
        let scratch = RenderCollection::new();
        let ctx = self.context(&scratch, "");
        self.attributes_in(&ctx, args)
    }

    /// Compose an attribute string inside an existing render context
    pub fn attributes_in(
        &self,
        ctx: &RenderContext<'_>,
        args: &Args,
    ) -> Result<String, RenderError> {
        let mut parts = Vec::with_capacity(args.len());
        for (name, value) in args {
            let mut text = self.stringify(value, ctx)?;
            if let Some(hook) = self.attr_hooks.get(name) {
                text = hook(&text);
            }
            if self.config.sensitive_attributes.iter().any(|s| s == name) {
                text = self.escaper.escape_html_attr(&text);
            }
            parts.push((self.attr_composer)(name, &text));
        }
        Ok(parts.join(" "))
    }

    /// Translate a message id through the configured translator
    pub fn translate(
        &self,
        id: &str,
        params: &Args,
        domain: Option<&str>,
        locale: Option<&str>,
    ) -> String {
        self.translator.translate(id, params, domain, locale)
    }

    /// The escaper this engine was configured with
    pub fn escaper(&self) -> &dyn Escaper {
        self.escaper.as_ref()
    }

    /// The active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compile a namespace into the cache if it is not already there
    ///
    /// The cache is only touched once compilation has fully succeeded; a
    /// failed compile leaves no partial namespace behind.
    fn ensure_compiled(&mut self, name: &str) -> Result<(), RenderError> {
        if self.cache.contains_key(name) {
            trace!(namespace = name, "template cache hit");
            return Ok(());
        }
        let finder = self
            .finder
            .as_mut()
            .ok_or_else(|| RenderError::TemplateNotFound { name: name.to_string() })?;
        let sources = finder.find(name)?;
        if sources.is_empty() {
            return Err(RenderError::TemplateNotFound { name: name.to_string() });
        }
        debug!(
            namespace = name,
            sources = sources.len(),
            "compiling template namespace"
        );
        let mut collection = RenderCollection::new();
        for source in &sources {
            let raw = source.load()?;
            collection.merge(RenderCollection::from_value(raw)?);
        }
        compile_leaves(&mut collection, name);
        self.cache.insert(name.to_string(), collection);
        Ok(())
    }
}

/// Convert every raw leaf into a renderer bound to `namespace`
///
/// Caller-supplied rendering functions are preserved as custom renderers;
/// everything else becomes a format renderer over its canonical text.
/// Already-compiled renderers pass through untouched.
fn compile_leaves(collection: &mut RenderCollection, namespace: &str) {
    collection.walk(&mut |node| match node {
        Node::Value(Value::Deferred(f)) => Node::Renderer(Renderer::Custom {
            f,
            namespace: namespace.to_string(),
        }),
        Node::Value(value) => Node::Renderer(Renderer::Format {
            template: value.canonical_text(),
            namespace: namespace.to_string(),
        }),
        other => other,
    });
}

/// Canonicalize bracketed form-field notation into dash notation
///
/// `data[user][name]` becomes `data-user-name`.
pub fn normalize_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '[' => {
                if !out.is_empty() && !out.ends_with('-') {
                    out.push('-');
                }
            }
            ']' => {}
            c => out.push(c),
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::args;
    use pretty_assertions::assert_eq;

    fn table_engine() -> Engine {
        let mut engine = Engine::new();
        engine
            .add_custom(
                "table",
                Value::map([
                    ("table", Value::from("<table>{rows}</table>")),
                    ("row", Value::from("<tr>{text}</tr>")),
                ]),
            )
            .expect("Should register");
        engine
    }

    #[test]
    fn test_render_with_custom_namespace() {
        let mut engine = table_engine();
        let html = engine
            .render("table", |ctx| {
                let row = ctx.call("row", &args([("text", "hi")]))?;
                Ok(Some(ctx.call("table", &args([("rows", row)]))?))
            })
            .expect("Should render");
        assert_eq!(html, "<table><tr>hi</tr></table>");
    }

    #[test]
    fn test_render_callback_without_value_yields_empty_string() {
        let mut engine = table_engine();
        let html = engine.render("table", |_ctx| Ok(None)).expect("Should render");
        assert_eq!(html, "");
    }

    #[test]
    fn test_render_unknown_namespace_without_finder() {
        let mut engine = Engine::new();
        let result = engine.render("nope", |_ctx| Ok(None));
        assert!(matches!(
            result,
            Err(RenderError::TemplateNotFound { .. })
        ));
    }

    #[test]
    fn test_add_custom_merges_per_key() {
        let mut engine = table_engine();
        engine
            .add_custom(
                "table",
                Value::map([
                    ("row", Value::from("<tr class=\"plain\">{text}</tr>")),
                    ("cell", Value::from("<td>{text}</td>")),
                ]),
            )
            .expect("Should merge");

        let html = engine
            .render("table", |ctx| {
                let row = ctx.call("row", &args([("text", "hi")]))?;
                let cell = ctx.call("cell", &args([("text", "c")]))?;
                Ok(Some(format!("{row}{cell}")))
            })
            .expect("Should render");
        assert_eq!(html, "<tr class=\"plain\">hi</tr><td>c</td>");
    }

    #[test]
    fn test_custom_callable_leaf_preserved() {
        let mut engine = Engine::new();
        engine
            .add_custom(
                "widgets",
                Value::map([(
                    "shout",
                    Value::deferred(|ctx, args| {
                        let text = match args.get("text") {
                            Some(v) => ctx.engine.stringify(v, ctx)?,
                            None => String::new(),
                        };
                        Ok(text.to_uppercase())
                    }),
                )]),
            )
            .expect("Should register");

        let out = engine
            .render("widgets", |ctx| {
                Ok(Some(ctx.call("shout", &args([("text", "hello")]))?))
            })
            .expect("Should render");
        assert_eq!(out, "HELLO");
    }

    #[test]
    fn test_nested_deferred_argument_resolved() {
        let mut engine = table_engine();
        let html = engine
            .render("table", |ctx| {
                let rows = Value::deferred(|inner, _| {
                    inner.call("row", &args([("text", "hi")]))
                });
                Ok(Some(ctx.call("table", &args([("rows", rows)]))?))
            })
            .expect("Should render");
        assert_eq!(html, "<table><tr>hi</tr></table>");
    }

    #[test]
    fn test_custom_param_injected_when_absent() {
        let mut engine = Engine::new();
        engine
            .add_custom(
                "page",
                Value::map([("div", Value::from("<div{attribs}>{text}</div>"))]),
            )
            .expect("Should register");
        engine.add_custom_param_callback("attribs", |value, ctx| match value {
            Some(Value::Map(map)) => Ok(Value::Str(format!(
                " {}",
                ctx.engine.attributes_in(ctx, map)?
            ))),
            Some(other) => Ok(other.clone()),
            None => Ok(Value::Str(String::new())),
        });

        let unset = engine
            .render("page", |ctx| {
                Ok(Some(ctx.call("div", &args([("text", "hi")]))?))
            })
            .expect("Should render");
        assert_eq!(unset, "<div>hi</div>");

        let set = engine
            .render("page", |ctx| {
                let attribs = Value::map([("class", Value::from("x"))]);
                Ok(Some(ctx.call(
                    "div",
                    &args([("text", Value::from("hi")), ("attribs", attribs)]),
                )?))
            })
            .expect("Should render");
        assert_eq!(set, "<div class=\"x\">hi</div>");
    }

    #[test]
    fn test_custom_param_injection_can_be_disabled() {
        let config =
            EngineConfig::from_str("inject-registered-params = false").expect("Should parse");
        let mut engine = Engine::new().with_config(config);
        engine
            .add_custom(
                "page",
                Value::map([("div", Value::from("<div{attribs}>{text}</div>"))]),
            )
            .expect("Should register");
        engine.add_custom_param_callback("attribs", |_value, _ctx| {
            Ok(Value::Str(" injected".to_string()))
        });

        let out = engine
            .render("page", |ctx| {
                Ok(Some(ctx.call("div", &args([("text", "hi")]))?))
            })
            .expect("Should render");
        // Without injection the tag stays literal
        assert_eq!(out, "<div{attribs}>hi</div>");
    }

    #[test]
    fn test_custom_param_callback_sees_resolved_deferred_value() {
        let mut engine = table_engine();
        engine.add_custom_param_callback("text", |value, _ctx| match value {
            Some(Value::Str(s)) => Ok(Value::Str(format!("[{s}]"))),
            Some(other) => panic!("Expected resolved string, got {:?}", other),
            None => Ok(Value::Null),
        });

        let html = engine
            .render("table", |ctx| {
                let late = Value::deferred(|_ctx, _args| Ok("late".to_string()));
                Ok(Some(ctx.call("row", &args([("text", late)]))?))
            })
            .expect("Should render");
        assert_eq!(html, "<tr>[late]</tr>");
    }

    #[test]
    fn test_remove_custom_param_callback_reports_existence() {
        let mut engine = Engine::new();
        engine.add_custom_param_callback("attribs", |_v, _c| Ok(Value::Null));
        assert!(engine.remove_custom_param_callback("attribs"));
        assert!(!engine.remove_custom_param_callback("attribs"));
    }

    #[test]
    fn test_attributes_composition() {
        let engine = Engine::new();
        let out = engine
            .attributes(&args([
                ("class", Value::from("btn")),
                ("id", Value::from("user[name]")),
                ("href", Value::from("/x?a=1&b=2")),
            ]))
            .expect("Should compose");
        insta::assert_snapshot!(out, @r#"class="btn" id="user-name" href="/x?a=1&amp;b=2""#);
    }

    #[test]
    fn test_attributes_empty_map() {
        let engine = Engine::new();
        assert_eq!(engine.attributes(&Args::new()).expect("Should compose"), "");
    }

    #[test]
    fn test_attributes_resolve_deferred_value() {
        let engine = Engine::new();
        let out = engine
            .attributes(&args([(
                "title",
                Value::deferred(|_ctx, _args| Ok("lazy".to_string())),
            )]))
            .expect("Should compose");
        assert_eq!(out, "title=\"lazy\"");
    }

    #[test]
    fn test_make_render_collection_is_uncached() {
        let mut engine = Engine::new();
        let collection = engine
            .make_render_collection(
                Value::map([("line", Value::from("{a}-{b}"))]),
                Some("adhoc"),
            )
            .expect("Should compile");
        let ctx = engine.context(&collection, "adhoc");
        let out = ctx
            .call("line", &args([("a", "x"), ("b", "y")]))
            .expect("Should render");
        assert_eq!(out, "x-y");

        // Nothing was registered under the ad hoc name
        let result = engine.render("adhoc", |_ctx| Ok(None));
        assert!(matches!(result, Err(RenderError::TemplateNotFound { .. })));
    }

    #[test]
    fn test_make_render_scalar() {
        let engine = Engine::new();
        let renderer = engine.make_render(Value::from("hello {name}"), None);
        let scratch = RenderCollection::new();
        let ctx = engine.context(&scratch, "");
        let out = renderer
            .call(&ctx, &args([("name", "world")]))
            .expect("Should render");
        assert_eq!(out, "hello world");
    }

    #[test]
    fn test_stringify_hook_overrides_canonical_form() {
        let mut engine = Engine::new().with_stringify(|value| match value {
            Value::Bool(b) => Some(if *b { "yes" } else { "no" }.to_string()),
            _ => None,
        });
        engine
            .add_custom("flags", Value::map([("flag", Value::from("{on}"))]))
            .expect("Should register");

        let out = engine
            .render("flags", |ctx| {
                Ok(Some(ctx.call("flag", &args([("on", true)]))?))
            })
            .expect("Should render");
        assert_eq!(out, "yes");
    }

    #[test]
    fn test_resolve_collection_for_introspection() {
        let mut engine = table_engine();
        let html = engine
            .render("table", |ctx| {
                let tree = ctx.collection.resolve(ctx, &args([("text", "t"), ("rows", "r")]))?;
                match tree {
                    Value::Map(map) => Ok(map.get("row").map(|v| v.canonical_text())),
                    _ => Ok(None),
                }
            })
            .expect("Should render");
        assert_eq!(html, "<tr>t</tr>");
    }

    #[test]
    fn test_translate_pass_through() {
        let engine = Engine::new();
        assert_eq!(engine.translate("msg.id", &Args::new(), None, None), "msg.id");
    }

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("data[user][name]"), "data-user-name");
        assert_eq!(normalize_id("plain"), "plain");
        assert_eq!(normalize_id("items[]"), "items");
    }

    #[test]
    fn test_sub_namespace_access() {
        let mut engine = Engine::new();
        engine
            .add_custom(
                "page",
                Value::map([(
                    "menu",
                    Value::map([("item", Value::from("<li>{label}</li>"))]),
                )]),
            )
            .expect("Should register");

        let out = engine
            .render("page", |ctx| {
                let menu = ctx.sub("menu")?;
                Ok(Some(menu.call("item", &args([("label", "Home")]))?))
            })
            .expect("Should render");
        assert_eq!(out, "<li>Home</li>");
    }
}
