//! Per-language data: rule orderings and intonation parameters.

use crate::error::ConfigError;
use crate::prosody::ProsodyParams;
use crate::rules::{Registry, RuleSet};

mod english_canadian;

pub use english_canadian::english_canadian;

/// A language: the rule passes it applies, in order, and its prosody.
#[derive(Debug, Clone)]
pub struct Language {
    pub name: &'static str,
    pub rule_ordering: &'static [&'static str],
    pub prosody: ProsodyParams,
}

impl Language {
    /// Resolves this language's ordering against a pass registry.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] for an empty ordering or a name the registry lacks.
    pub fn rule_set(&self, registry: &Registry) -> Result<RuleSet, ConfigError> {
        RuleSet::resolve(self.rule_ordering, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_language_orderings_resolve() {
        let registry = Registry::builtin();
        let language = english_canadian();
        let set = language.rule_set(&registry).unwrap();
        assert_eq!(set.names().len(), language.rule_ordering.len());
        // Pause insertion must run last so earlier passes never see
        // inserted silence.
        assert_eq!(set.names().last(), Some(&"pause-insertion"));
    }
}
