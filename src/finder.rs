//! Template source lookup
//!
//! The engine does not scan directories itself; it consumes a
//! [`TemplateFinder`] that maps a requested namespace name to zero or more
//! readable sources. [`DirFinder`] is the file-system implementation: a
//! name resolves either as a path relative to the root, or by suffix match
//! against a lazily built index of the tree. Ambiguous names return every
//! match; the engine merges them in order.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::RenderError;
use crate::value::Value;

/// Resolves a requested template name to an ordered set of sources
pub trait TemplateFinder {
    fn find(&mut self, name: &str) -> Result<Vec<TemplateSource>, RenderError>;
}

/// One readable template source
#[derive(Debug, Clone)]
pub struct TemplateSource {
    path: PathBuf,
}

impl TemplateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the source into a raw nested map of template parts
    pub fn load(&self) -> Result<Value, RenderError> {
        let content = fs::read_to_string(&self.path).map_err(|e| RenderError::FileRead {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let table: toml::Table = toml::from_str(&content).map_err(|e| RenderError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        Ok(Value::from(toml::Value::Table(table)))
    }
}

/// File finder rooted at a template directory
///
/// The index of the tree is built on first use and rebuilt once per lookup
/// that finds nothing, so files added after construction are still picked
/// up. The index is only ever stored fully built.
#[derive(Debug)]
pub struct DirFinder {
    root: PathBuf,
    extensions: Vec<String>,
    index: Option<Vec<PathBuf>>,
}

impl DirFinder {
    /// Create a finder over an existing directory
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, RenderError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(RenderError::InvalidConfiguration {
                message: format!("template root {} is not a directory", root.display()),
            });
        }
        Ok(Self {
            root,
            extensions: vec!["toml".to_string()],
            index: None,
        })
    }

    /// Set the file extensions considered template sources
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    fn ensure_index(&mut self) -> Result<(), RenderError> {
        if self.index.is_some() {
            return Ok(());
        }
        let mut files = Vec::new();
        scan_tree(&self.root, &self.extensions, &mut files)?;
        files.sort();
        trace!(
            root = %self.root.display(),
            files = files.len(),
            "built template file index"
        );
        self.index = Some(files);
        Ok(())
    }

    fn search(&mut self, name: &str) -> Result<Vec<PathBuf>, RenderError> {
        self.ensure_index()?;
        let files = self.index.as_deref().unwrap_or(&[]);
        Ok(files
            .iter()
            .filter(|path| self.matches(path, name))
            .cloned()
            .collect())
    }

    fn matches(&self, path: &Path, name: &str) -> bool {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        if suffix_match(rel, name) {
            return true;
        }
        // Extensionless names try each configured extension
        if !name.contains('.') {
            return self
                .extensions
                .iter()
                .any(|ext| suffix_match(rel, &format!("{name}.{ext}")));
        }
        false
    }
}

impl TemplateFinder for DirFinder {
    fn find(&mut self, name: &str) -> Result<Vec<TemplateSource>, RenderError> {
        let direct = self.root.join(name);
        if direct.is_file() {
            return Ok(vec![TemplateSource::new(direct)]);
        }
        let mut matches = self.search(name)?;
        if matches.is_empty() {
            // Stale index: rebuild once and retry
            self.index = None;
            matches = self.search(name)?;
        }
        Ok(matches.into_iter().map(TemplateSource::new).collect())
    }
}

/// Match a relative path against a requested name, whole path or suffix
fn suffix_match(rel: &Path, name: &str) -> bool {
    let rel_str = rel.to_string_lossy();
    let rel_str = rel_str.replace(std::path::MAIN_SEPARATOR, "/");
    rel_str == name || rel_str.ends_with(&format!("/{name}"))
}

fn scan_tree(
    dir: &Path,
    extensions: &[String],
    files: &mut Vec<PathBuf>,
) -> Result<(), RenderError> {
    let entries = fs::read_dir(dir).map_err(|e| RenderError::FileRead {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| RenderError::FileRead {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let path = entry.path();
        if path.is_dir() {
            scan_tree(&path, extensions, files)?;
            continue;
        }
        let allowed = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.iter().any(|x| x == e))
            .unwrap_or(false);
        if allowed {
            files.push(path);
        }
    }
    Ok(())
}
