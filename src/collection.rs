//! Render collections - ordered, recursive containers of template parts
//!
//! A [`RenderCollection`] holds one compiled template namespace: an ordered
//! map from part name to either a nested collection (sub-namespace) or a
//! leaf [`Renderer`]. Before compilation the same structure carries raw
//! [`Value`] leaves; compilation walks the tree and replaces every raw leaf
//! with a renderer, so that after compile time no leaf is a bare scalar.

use std::fmt;

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::engine::Engine;
use crate::error::RenderError;
use crate::value::{Args, RenderFn, Value};

/// One entry in a render collection
#[derive(Debug, Clone)]
pub enum Node {
    /// Raw leaf value, present only before compilation
    Value(Value),
    /// Compiled leaf renderer
    Renderer(Renderer),
    /// Nested sub-namespace
    Collection(RenderCollection),
}

/// A compiled leaf: substitutes placeholders in a stored fragment, or runs
/// a caller-supplied rendering function
#[derive(Clone)]
pub enum Renderer {
    /// A format string with `{name}` placeholders, bound to its namespace
    Format { template: String, namespace: String },
    /// A caller-supplied rendering function, preserved untouched by
    /// compilation
    Custom { f: RenderFn, namespace: String },
}

/// Invocation context handed to deferred renderers and render callbacks
///
/// Renderers do not capture the engine; the context carries the owning
/// collection, the engine, and the namespace identifier explicitly.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    /// The compiled collection of the namespace being rendered
    pub collection: &'a RenderCollection,
    /// The engine that compiled it
    pub engine: &'a Engine,
    /// The namespace identifier
    pub namespace: &'a str,
}

impl<'a> RenderContext<'a> {
    /// Invoke the leaf renderer stored under `key` with the given arguments
    pub fn call(&self, key: &str, args: &Args) -> Result<String, RenderError> {
        let collection: &'a RenderCollection = self.collection;
        match collection.get(key)? {
            Node::Renderer(renderer) => renderer.call(self, args),
            _ => Err(RenderError::NotARenderer { key: key.to_string() }),
        }
    }

    /// Descend into the sub-namespace stored under `key`
    pub fn sub(&self, key: &str) -> Result<RenderContext<'a>, RenderError> {
        let collection: &'a RenderCollection = self.collection;
        match collection.get(key)? {
            Node::Collection(inner) => Ok(RenderContext {
                collection: inner,
                engine: self.engine,
                namespace: self.namespace,
            }),
            _ => Err(RenderError::NotACollection { key: key.to_string() }),
        }
    }
}

impl Renderer {
    /// Run this renderer against an argument map
    pub fn call(&self, ctx: &RenderContext<'_>, args: &Args) -> Result<String, RenderError> {
        match self {
            Renderer::Format { template, .. } => ctx.engine.substitute(template, args, ctx),
            Renderer::Custom { f, .. } => f(ctx, args),
        }
    }

    /// The namespace this renderer was compiled for
    pub fn namespace(&self) -> &str {
        match self {
            Renderer::Format { namespace, .. } | Renderer::Custom { namespace, .. } => namespace,
        }
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Renderer::Format { template, namespace } => f
                .debug_struct("Format")
                .field("template", template)
                .field("namespace", namespace)
                .finish(),
            Renderer::Custom { namespace, .. } => f
                .debug_struct("Custom")
                .field("namespace", namespace)
                .finish_non_exhaustive(),
        }
    }
}

/// Ordered key to value container for one template-part namespace
#[derive(Debug, Clone, Default)]
pub struct RenderCollection {
    entries: IndexMap<String, Node>,
}

impl RenderCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pre-compile collection from a raw map value
    ///
    /// Nested maps become sub-collections; lists become sub-collections
    /// keyed `"0"`, `"1"`, ...; scalars stay raw leaves until compilation.
    pub fn from_value(value: Value) -> Result<Self, RenderError> {
        match value {
            Value::Map(map) => {
                let entries = map
                    .into_iter()
                    .map(|(key, v)| (key, node_from_value(v)))
                    .collect();
                Ok(Self { entries })
            }
            other => Err(RenderError::InvalidConfiguration {
                message: format!(
                    "template data must be a map of named parts, got {:?}",
                    other
                ),
            }),
        }
    }

    /// Get the node stored under `key`
    ///
    /// A missing key is an authoring error and fails with
    /// [`RenderError::KeyNotFound`] rather than returning a silent default.
    pub fn get(&self, key: &str) -> Result<&Node, RenderError> {
        self.entries
            .get(key)
            .ok_or_else(|| RenderError::KeyNotFound { key: key.to_string() })
    }

    /// Store a node under `key`, overwriting any existing entry
    pub fn set(&mut self, key: impl Into<String>, node: Node) {
        self.entries.insert(key.into(), node);
    }

    /// Check whether a key exists
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries in this collection
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this collection holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    /// Recursively replace every leaf node with `transform(node)`
    ///
    /// Collections are recursed into, not transformed. Depth-first, in
    /// insertion order.
    pub fn walk<F: FnMut(Node) -> Node>(&mut self, transform: &mut F) {
        for node in self.entries.values_mut() {
            match node {
                Node::Collection(inner) => inner.walk(transform),
                _ => {
                    let taken = std::mem::replace(node, Node::Value(Value::Null));
                    *node = transform(taken);
                }
            }
        }
    }

    /// Recursive structural merge
    ///
    /// Where both sides hold collections the merge recurses key-by-key;
    /// otherwise the incoming value overwrites. Existing keys keep their
    /// position; new keys append in encounter order.
    pub fn merge(&mut self, other: RenderCollection) {
        for (key, incoming) in other.entries {
            match self.entries.entry(key) {
                Entry::Occupied(mut slot) => match (slot.get_mut(), incoming) {
                    (Node::Collection(existing), Node::Collection(new)) => existing.merge(new),
                    (slot_node, incoming) => *slot_node = incoming,
                },
                Entry::Vacant(slot) => {
                    slot.insert(incoming);
                }
            }
        }
    }

    /// Invoke every renderer leaf with `args`, producing a plain value tree
    ///
    /// Convenience for introspection and testing; rendering proper goes
    /// through individual renderer calls instead.
    pub fn resolve(&self, ctx: &RenderContext<'_>, args: &Args) -> Result<Value, RenderError> {
        let mut out = IndexMap::new();
        for (key, node) in &self.entries {
            let value = match node {
                Node::Collection(inner) => inner.resolve(ctx, args)?,
                Node::Renderer(renderer) => Value::Str(renderer.call(ctx, args)?),
                Node::Value(v) => v.clone(),
            };
            out.insert(key.clone(), value);
        }
        Ok(Value::Map(out))
    }
}

fn node_from_value(value: Value) -> Node {
    match value {
        Value::Map(map) => {
            let entries = map
                .into_iter()
                .map(|(key, v)| (key, node_from_value(v)))
                .collect();
            Node::Collection(RenderCollection { entries })
        }
        Value::List(items) => {
            let entries = items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), node_from_value(v)))
                .collect();
            Node::Collection(RenderCollection { entries })
        }
        leaf => Node::Value(leaf),
    }
}
