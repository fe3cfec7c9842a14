//! An XPath evaluator preconfigured for form evaluation.
//!
//! Wraps [`Evaluator`] with the three domain libraries and the shared form
//! state. Unprefixed function calls resolve ODK first, then XForms, then the
//! core library, so a domain override of a core name wins without hiding the
//! rest of the core set.

use std::collections::HashMap;
use std::ops::Deref;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use formpath_xpath::error::Error;
use formpath_xpath::evaluator::Evaluator;
use formpath_xpath::library::FunctionLibrary;
use formpath_xpath::model::NodeAdapter;

use crate::functions::{
    javarosa_function_library, odk_function_library, xforms_function_library,
};
use crate::state::XFormsState;

/// Evaluator plus form state. Dereferences to [`Evaluator`], so the whole
/// `evaluate*` surface is available directly.
pub struct XFormsEvaluator<A: NodeAdapter> {
    inner: Evaluator<A>,
    state: Rc<XFormsState<A::Node>>,
}

impl<A: NodeAdapter> Deref for XFormsEvaluator<A> {
    type Target = Evaluator<A>;

    fn deref(&self) -> &Evaluator<A> {
        &self.inner
    }
}

impl<A: NodeAdapter> XFormsEvaluator<A> {
    pub fn builder(adapter: A) -> XFormsEvaluatorBuilder<A> {
        XFormsEvaluatorBuilder::new(adapter)
    }

    pub fn state(&self) -> &XFormsState<A::Node> {
        &self.state
    }

    /// Registered translation languages.
    pub fn languages(&self) -> Vec<String> {
        self.state.languages()
    }

    pub fn active_language(&self) -> Option<String> {
        self.state.active_language()
    }

    /// Switch the language `jr:itext()` reads from; `None` clears the
    /// selection so the default language applies again.
    pub fn set_language(&self, language: Option<&str>) -> Result<(), Error> {
        self.state.set_language(language)
    }
}

/// Builder collecting form state and evaluator configuration.
pub struct XFormsEvaluatorBuilder<A: NodeAdapter> {
    adapter: A,
    root: Option<A::Node>,
    timezone: Option<FixedOffset>,
    now_override: Option<DateTime<FixedOffset>>,
    secondary_instances: HashMap<String, A::Node>,
    translations: HashMap<String, HashMap<String, String>>,
    default_language: Option<String>,
    extra_libraries: Vec<FunctionLibrary<A>>,
}

impl<A: NodeAdapter> XFormsEvaluatorBuilder<A> {
    pub fn new(adapter: A) -> Self {
        XFormsEvaluatorBuilder {
            adapter,
            root: None,
            timezone: None,
            now_override: None,
            secondary_instances: HashMap::new(),
            translations: HashMap::new(),
            default_language: None,
            extra_libraries: Vec::new(),
        }
    }

    /// Register the root of a secondary instance under its id, for
    /// `instance('id')`.
    pub fn with_secondary_instance(mut self, id: impl Into<String>, root: A::Node) -> Self {
        self.secondary_instances.insert(id.into(), root);
        self
    }

    /// Register one itext entry. The first language registered becomes the
    /// default unless [`Self::with_default_language`] overrides it.
    pub fn with_translation(
        mut self,
        language: impl Into<String>,
        id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let language = language.into();
        if self.default_language.is_none() {
            self.default_language = Some(language.clone());
        }
        self.translations
            .entry(language)
            .or_default()
            .insert(id.into(), text.into());
        self
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = Some(language.into());
        self
    }

    /// An additional domain library, reachable through explicit namespacing.
    pub fn with_function_library(mut self, library: FunctionLibrary<A>) -> Self {
        self.extra_libraries.push(library);
        self
    }

    pub fn with_root_node(mut self, root: A::Node) -> Self {
        self.root = Some(root);
        self
    }

    pub fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = Some(timezone);
        self
    }

    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now_override = Some(now);
        self
    }

    pub fn build(self) -> Result<XFormsEvaluator<A>, Error> {
        debug!(
            instances = self.secondary_instances.len(),
            languages = self.translations.len(),
            "building form evaluator"
        );
        let state = Rc::new(XFormsState::new(
            self.secondary_instances,
            self.translations,
            self.default_language,
        ));
        let mut builder = Evaluator::builder(self.adapter)
            .with_default_function_library(odk_function_library())
            .with_default_function_library(xforms_function_library(Rc::clone(&state)))
            .with_function_library(javarosa_function_library(Rc::clone(&state)));
        for library in self.extra_libraries {
            builder = builder.with_function_library(library);
        }
        if let Some(root) = self.root {
            builder = builder.with_root_node(root);
        }
        if let Some(timezone) = self.timezone {
            builder = builder.with_timezone(timezone);
        }
        if let Some(now) = self.now_override {
            builder = builder.with_now(now);
        }
        Ok(XFormsEvaluator {
            inner: builder.build()?,
            state,
        })
    }
}
