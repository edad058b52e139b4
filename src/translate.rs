//! Translation capability
//!
//! The engine exposes [`Engine::translate`] as a pass-through to whatever
//! translator it was configured with; [`IdentityTranslator`] is the
//! default and returns the id unchanged.
//!
//! [`Engine::translate`]: crate::engine::Engine::translate

use crate::value::Args;

/// Looks up a translated string for a message id
pub trait Translator {
    fn translate(
        &self,
        id: &str,
        params: &Args,
        domain: Option<&str>,
        locale: Option<&str>,
    ) -> String;
}

/// Default translator: the id is its own translation
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn translate(
        &self,
        id: &str,
        _params: &Args,
        _domain: Option<&str>,
        _locale: Option<&str>,
    ) -> String {
        id.to_string()
    }
}
