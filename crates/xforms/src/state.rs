//! Shared form state: secondary instances and itext translations.

use std::cell::RefCell;
use std::collections::HashMap;

use formpath_xpath::Error;
use tracing::debug;

/// State the XForms function libraries close over.
///
/// Built once per form alongside the evaluator and shared by every function
/// implementation that needs it. Only the active language is mutable after
/// construction.
pub struct XFormsState<N> {
    secondary_instances: HashMap<String, N>,
    translations: HashMap<String, HashMap<String, String>>,
    default_language: Option<String>,
    active_language: RefCell<Option<String>>,
}

impl<N: Clone> XFormsState<N> {
    pub(crate) fn new(
        secondary_instances: HashMap<String, N>,
        translations: HashMap<String, HashMap<String, String>>,
        default_language: Option<String>,
    ) -> Self {
        XFormsState {
            secondary_instances,
            translations,
            default_language,
            active_language: RefCell::new(None),
        }
    }

    /// Root node of the secondary instance registered under `id`.
    pub fn instance(&self, id: &str) -> Option<N> {
        self.secondary_instances.get(id).cloned()
    }

    /// Registered translation languages, in no particular order.
    pub fn languages(&self) -> Vec<String> {
        self.translations.keys().cloned().collect()
    }

    /// The language `itext()` currently reads from: the explicitly selected
    /// one, or the configured default.
    pub fn active_language(&self) -> Option<String> {
        self.active_language
            .borrow()
            .clone()
            .or_else(|| self.default_language.clone())
    }

    /// Switch the active language, or clear the selection with `None` so
    /// `itext()` falls back to the configured default. Selecting a language
    /// with no registered translations is an error and leaves the current
    /// selection untouched.
    pub fn set_language(&self, language: Option<&str>) -> Result<(), Error> {
        if let Some(language) = language {
            if !self.translations.contains_key(language) {
                return Err(Error::Evaluation(format!(
                    "unknown itext language `{language}`"
                )));
            }
            debug!(language, "switching itext language");
            *self.active_language.borrow_mut() = Some(language.to_string());
        } else {
            debug!("resetting itext language to the default");
            *self.active_language.borrow_mut() = None;
        }
        Ok(())
    }

    /// Translated text for `id` in the active language.
    pub fn itext(&self, id: &str) -> Result<String, Error> {
        let language = self.active_language().ok_or_else(|| {
            Error::Evaluation("itext() called with no active language".to_string())
        })?;
        self.translations
            .get(&language)
            .and_then(|texts| texts.get(id))
            .cloned()
            .ok_or_else(|| {
                Error::Evaluation(format!(
                    "no itext entry `{id}` for language `{language}`"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> XFormsState<()> {
        let mut en = HashMap::new();
        en.insert("greeting".to_string(), "hello".to_string());
        let mut fr = HashMap::new();
        fr.insert("greeting".to_string(), "bonjour".to_string());
        let mut translations = HashMap::new();
        translations.insert("en".to_string(), en);
        translations.insert("fr".to_string(), fr);
        XFormsState::new(HashMap::new(), translations, Some("en".to_string()))
    }

    #[test]
    fn default_language_serves_until_switched() {
        let state = state();
        assert_eq!(state.itext("greeting").unwrap(), "hello");
        state.set_language(Some("fr")).unwrap();
        assert_eq!(state.itext("greeting").unwrap(), "bonjour");
    }

    #[test]
    fn clearing_the_selection_restores_the_default() {
        let state = state();
        state.set_language(Some("fr")).unwrap();
        assert_eq!(state.active_language().as_deref(), Some("fr"));
        state.set_language(None).unwrap();
        assert_eq!(state.active_language().as_deref(), Some("en"));
        assert_eq!(state.itext("greeting").unwrap(), "hello");
    }

    #[test]
    fn unknown_language_is_rejected() {
        let state = state();
        assert!(state.set_language(Some("de")).is_err());
        assert_eq!(state.active_language().as_deref(), Some("en"));
    }

    #[test]
    fn missing_entry_is_an_error() {
        let state = state();
        assert!(state.itext("farewell").is_err());
    }
}
