//! Partwork - a callback-driven template-part renderer
//!
//! Templates are nested maps of named string fragments containing
//! `{placeholder}` markers. Rendering hands a compiled collection of
//! deferred renderers to a caller-supplied callback; the callback invokes
//! leaf renderers with argument maps, and nesting and iteration are
//! expressed in Rust rather than in a template language.
//!
//! # Example
//!
//! ```rust
//! use partwork::{args, Engine, Value};
//!
//! let mut engine = Engine::new();
//! engine.add_custom("table", Value::map([
//!     ("table", Value::from("<table>{rows}</table>")),
//!     ("row", Value::from("<tr>{text}</tr>")),
//! ])).unwrap();
//!
//! let html = engine.render("table", |ctx| {
//!     let row = ctx.call("row", &args([("text", "hi")]))?;
//!     Ok(Some(ctx.call("table", &args([("rows", row)]))?))
//! }).unwrap();
//!
//! assert_eq!(html, "<table><tr>hi</tr></table>");
//! ```
//!
//! Namespaces can also be resolved from TOML files under a directory root
//! (see [`Engine::with_root`] and [`DirFinder`]); the first render of a
//! namespace reads and compiles its sources, later renders hit the cache.

pub mod collection;
pub mod config;
pub mod engine;
pub mod error;
pub mod escape;
pub mod finder;
pub mod substitute;
pub mod translate;
pub mod value;

pub use collection::{Node, RenderCollection, RenderContext, Renderer};
pub use config::{ConfigError, EngineConfig};
pub use engine::{normalize_id, Engine};
pub use error::RenderError;
pub use escape::{DefaultEscaper, Escaper};
pub use finder::{DirFinder, TemplateFinder, TemplateSource};
pub use translate::{IdentityTranslator, Translator};
pub use value::{args, Args, RenderFn, Value};
