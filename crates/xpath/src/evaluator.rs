//! The evaluator: long-lived pairing of a tree adapter with a function
//! library collection, an optional scoping root, and time configuration.
//!
//! One evaluator serves many `evaluate*` calls. Namespace resolvers are
//! cached per (context node, external resolver) binding so repeated
//! evaluations against the same scope reuse warm prefix caches.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset, Local};
use tracing::trace;

use crate::context::EvaluationContext;
use crate::engine;
use crate::error::Error;
use crate::functions::core_function_library;
use crate::library::{FunctionLibrary, FunctionLibraryCollection};
use crate::model::{NodeAdapter, NodeKind};
use crate::parser;
use crate::resolver::{NamespaceResolver, PrefixResolver};
use crate::value::{self, ResultType, XPathResult};

pub struct Evaluator<A: NodeAdapter> {
    adapter: A,
    functions: FunctionLibraryCollection<A>,
    root: Option<A::Node>,
    timezone: FixedOffset,
    now_override: Option<DateTime<FixedOffset>>,
    resolvers: RefCell<Vec<Rc<NamespaceResolver<A::Node>>>>,
}

impl<A: NodeAdapter> Evaluator<A> {
    /// An evaluator with the core function library, no scoping root, and the
    /// local timezone.
    pub fn new(adapter: A) -> Self {
        Evaluator {
            adapter,
            functions: FunctionLibraryCollection::single_default(core_function_library()),
            root: None,
            timezone: local_offset(),
            now_override: None,
            resolvers: RefCell::new(Vec::new()),
        }
    }

    pub fn builder(adapter: A) -> EvaluatorBuilder<A> {
        EvaluatorBuilder::new(adapter)
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn functions(&self) -> &FunctionLibraryCollection<A> {
        &self.functions
    }

    /// The configured scoping root, if any. Absolute paths resolve to it and
    /// ancestor traversal stops at it.
    pub fn root_node(&self) -> Option<&A::Node> {
        self.root.as_ref()
    }

    pub fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    /// The current instant in the evaluator's timezone, or the configured
    /// fixed instant when one was set for deterministic evaluation.
    pub fn now(&self) -> DateTime<FixedOffset> {
        match self.now_override {
            Some(instant) => instant,
            None => Local::now().with_timezone(&self.timezone),
        }
    }

    /// Evaluate `expression` and coerce the result to `result_type`.
    ///
    /// The context node defaults to the configured root when omitted. The
    /// external resolver, when given, takes priority over prefix bindings
    /// found in the tree and over the built-in prefix table.
    pub fn evaluate(
        &self,
        expression: &str,
        context_node: Option<&A::Node>,
        resolver: Option<Rc<dyn PrefixResolver>>,
        result_type: ResultType,
    ) -> Result<XPathResult<A::Node>, Error> {
        let node = context_node
            .or(self.root.as_ref())
            .cloned()
            .ok_or(Error::MissingContextNode)?;
        assert!(
            self.adapter.is_xpath_node(&node),
            "context node kind is outside the XPath data model"
        );
        trace!(expression, "evaluating expression");
        let expr = parser::parse(expression)?;
        let containing_document = self.adapter.containing_document(&node);
        let resolver = self.resolver_for(&node, resolver);
        let ctx = EvaluationContext::new(self, node, containing_document, self.root.clone(), resolver);
        let value = engine::evaluate_expr(&ctx, &expr)?;
        XPathResult::coerce(value, result_type, &self.adapter)
    }

    pub fn evaluate_boolean(
        &self,
        expression: &str,
        context_node: Option<&A::Node>,
    ) -> Result<bool, Error> {
        let result = self.evaluate(expression, context_node, None, ResultType::Boolean)?;
        result
            .boolean()
            .ok_or_else(|| Error::evaluation("expected a boolean result"))
    }

    pub fn evaluate_number(
        &self,
        expression: &str,
        context_node: Option<&A::Node>,
    ) -> Result<f64, Error> {
        let result = self.evaluate(expression, context_node, None, ResultType::Number)?;
        result
            .number()
            .ok_or_else(|| Error::evaluation("expected a numeric result"))
    }

    pub fn evaluate_string(
        &self,
        expression: &str,
        context_node: Option<&A::Node>,
    ) -> Result<String, Error> {
        let result = self.evaluate(expression, context_node, None, ResultType::String)?;
        result
            .string()
            .map(str::to_string)
            .ok_or_else(|| Error::evaluation("expected a string result"))
    }

    /// First matching node in document order, if any.
    pub fn evaluate_node(
        &self,
        expression: &str,
        context_node: Option<&A::Node>,
    ) -> Result<Option<A::Node>, Error> {
        let result =
            self.evaluate(expression, context_node, None, ResultType::FirstOrderedNode)?;
        Ok(result.first_node().cloned())
    }

    /// First matching element in document order, skipping over nodes of
    /// other kinds.
    pub fn evaluate_element(
        &self,
        expression: &str,
        context_node: Option<&A::Node>,
    ) -> Result<Option<A::Node>, Error> {
        let result =
            self.evaluate(expression, context_node, None, ResultType::OrderedNodeSnapshot)?;
        Ok(result
            .nodes()
            .and_then(|nodes| value::first_element(&self.adapter, nodes)))
    }

    /// Like [`Self::evaluate_element`] but an empty match is an error naming
    /// the expression.
    pub fn evaluate_required_element(
        &self,
        expression: &str,
        context_node: Option<&A::Node>,
    ) -> Result<A::Node, Error> {
        self.evaluate_element(expression, context_node)?
            .ok_or_else(|| Error::NodeRequired {
                expression: expression.to_string(),
            })
    }

    /// All matching nodes, deduplicated, in document order.
    pub fn evaluate_nodes(
        &self,
        expression: &str,
        context_node: Option<&A::Node>,
    ) -> Result<Vec<A::Node>, Error> {
        let result =
            self.evaluate(expression, context_node, None, ResultType::OrderedNodeSnapshot)?;
        Ok(result.nodes().map(<[A::Node]>::to_vec).unwrap_or_default())
    }

    /// Fail with [`Error::NodeRequired`] unless the expression matches at
    /// least one node.
    pub fn assert_exists(
        &self,
        expression: &str,
        context_node: Option<&A::Node>,
    ) -> Result<(), Error> {
        let result =
            self.evaluate(expression, context_node, None, ResultType::FirstOrderedNode)?;
        if result.first_node().is_none() {
            return Err(Error::NodeRequired {
                expression: expression.to_string(),
            });
        }
        Ok(())
    }

    /// A resolver bound to `node` and `external`, reused across evaluations
    /// when an equivalent binding already exists.
    fn resolver_for(
        &self,
        node: &A::Node,
        external: Option<Rc<dyn PrefixResolver>>,
    ) -> Rc<NamespaceResolver<A::Node>> {
        let mut resolvers = self.resolvers.borrow_mut();
        if let Some(existing) = resolvers
            .iter()
            .find(|r| r.is_bound_to(node, external.as_ref()))
        {
            return Rc::clone(existing);
        }
        let fresh = Rc::new(NamespaceResolver::new(node.clone(), external));
        resolvers.push(Rc::clone(&fresh));
        fresh
    }
}

/// Builder for evaluators carrying domain function libraries, a scoping
/// root, or non-default time configuration.
pub struct EvaluatorBuilder<A: NodeAdapter> {
    adapter: A,
    libraries: Vec<FunctionLibrary<A>>,
    default_namespaces: Vec<String>,
    root: Option<A::Node>,
    timezone: Option<FixedOffset>,
    now_override: Option<DateTime<FixedOffset>>,
}

impl<A: NodeAdapter> EvaluatorBuilder<A> {
    pub fn new(adapter: A) -> Self {
        EvaluatorBuilder {
            adapter,
            libraries: Vec::new(),
            default_namespaces: Vec::new(),
            root: None,
            timezone: None,
            now_override: None,
        }
    }

    /// Register a library reachable through explicitly namespaced calls
    /// only.
    pub fn with_function_library(mut self, library: FunctionLibrary<A>) -> Self {
        self.libraries.push(library);
        self
    }

    /// Register a library and append its namespace to the default chain for
    /// unprefixed calls. Earlier additions shadow later ones; the core
    /// library always sits at the end of the chain.
    pub fn with_default_function_library(mut self, library: FunctionLibrary<A>) -> Self {
        self.default_namespaces
            .push(library.namespace_uri().to_string());
        self.libraries.push(library);
        self
    }

    /// Scope evaluation to `root`: absolute paths resolve to it and ancestor
    /// traversal cannot escape it. Must be a document or element node.
    pub fn with_root_node(mut self, root: A::Node) -> Self {
        self.root = Some(root);
        self
    }

    pub fn with_timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = Some(timezone);
        self
    }

    /// Pin the evaluator's notion of "now" to a fixed instant.
    pub fn with_now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.now_override = Some(now);
        self
    }

    pub fn build(self) -> Result<Evaluator<A>, Error> {
        if let Some(root) = &self.root {
            let kind = self.adapter.node_kind(root);
            if !matches!(kind, NodeKind::Document | NodeKind::Element) {
                return Err(Error::InvalidRootNode(format!(
                    "{kind:?} nodes cannot scope evaluation"
                )));
            }
        }
        let mut libraries = self.libraries;
        let mut default_namespaces = self.default_namespaces;
        let core = core_function_library();
        default_namespaces.push(core.namespace_uri().to_string());
        libraries.push(core);
        let functions = FunctionLibraryCollection::new(libraries, default_namespaces)?;
        Ok(Evaluator {
            adapter: self.adapter,
            functions,
            root: self.root,
            timezone: self.timezone.unwrap_or_else(local_offset),
            now_override: self.now_override,
            resolvers: RefCell::new(Vec::new()),
        })
    }
}

fn local_offset() -> FixedOffset {
    *Local::now().offset()
}
