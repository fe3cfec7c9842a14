//! Per-call evaluation context.
//!
//! Constructed by the evaluator immediately before expression evaluation,
//! passed by reference through every sub-expression, and discarded when the
//! call returns. Immutable: predicate evaluation clones a new context with a
//! different focus instead of mutating this one.

use std::rc::Rc;

use chrono::{DateTime, FixedOffset};

use crate::evaluator::Evaluator;
use crate::library::FunctionLibraryCollection;
use crate::model::NodeAdapter;
use crate::resolver::NamespaceResolver;

pub struct EvaluationContext<'e, A: NodeAdapter> {
    evaluator: &'e Evaluator<A>,
    /// The call-site context node, constant for the whole evaluation.
    /// Expressions referencing "the node active when evaluation began"
    /// (XForms `current()`) read this, not the focus node.
    evaluation_context_node: A::Node,
    containing_document: A::Node,
    scoped_root: Option<A::Node>,
    context_node: A::Node,
    position: usize,
    size: usize,
    resolver: Rc<NamespaceResolver<A::Node>>,
}

impl<A: NodeAdapter> Clone for EvaluationContext<'_, A> {
    fn clone(&self) -> Self {
        EvaluationContext {
            evaluator: self.evaluator,
            evaluation_context_node: self.evaluation_context_node.clone(),
            containing_document: self.containing_document.clone(),
            scoped_root: self.scoped_root.clone(),
            context_node: self.context_node.clone(),
            position: self.position,
            size: self.size,
            resolver: Rc::clone(&self.resolver),
        }
    }
}

impl<'e, A: NodeAdapter> EvaluationContext<'e, A> {
    pub(crate) fn new(
        evaluator: &'e Evaluator<A>,
        context_node: A::Node,
        containing_document: A::Node,
        scoped_root: Option<A::Node>,
        resolver: Rc<NamespaceResolver<A::Node>>,
    ) -> Self {
        EvaluationContext {
            evaluator,
            evaluation_context_node: context_node.clone(),
            containing_document,
            scoped_root,
            context_node,
            position: 1,
            size: 1,
            resolver,
        }
    }

    pub fn adapter(&self) -> &'e A {
        self.evaluator.adapter()
    }

    pub fn functions(&self) -> &'e FunctionLibraryCollection<A> {
        self.evaluator.functions()
    }

    pub fn resolver(&self) -> &NamespaceResolver<A::Node> {
        &self.resolver
    }

    /// The current focus node.
    pub fn context_node(&self) -> &A::Node {
        &self.context_node
    }

    /// The original call-site context node.
    pub fn evaluation_context_node(&self) -> &A::Node {
        &self.evaluation_context_node
    }

    pub fn containing_document(&self) -> &A::Node {
        &self.containing_document
    }

    pub fn scoped_root(&self) -> Option<&A::Node> {
        self.scoped_root.as_ref()
    }

    /// Proximity position of the focus node, 1-based.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Size of the current context node list.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn timezone(&self) -> FixedOffset {
        self.evaluator.timezone()
    }

    /// The active instant, honoring a deterministic override on the
    /// evaluator.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.evaluator.now()
    }

    /// A sibling context focused on another node of a context list.
    pub fn with_focus(&self, node: A::Node, position: usize, size: usize) -> Self {
        let mut ctx = self.clone();
        ctx.context_node = node;
        ctx.position = position;
        ctx.size = size;
        ctx
    }

    /// The node absolute paths resolve against: the configured scoping root
    /// if any, otherwise the containing document.
    pub fn effective_root(&self) -> A::Node {
        self.scoped_root
            .clone()
            .unwrap_or_else(|| self.containing_document.clone())
    }

    /// Parent traversal clamped at the scoping root: ascending above the
    /// configured root yields nothing, keeping independently scoped
    /// evaluation roots isolated within one tree.
    pub fn parent_of(&self, node: &A::Node) -> Option<A::Node> {
        if let Some(root) = &self.scoped_root
            && node == root
        {
            return None;
        }
        self.adapter().parent(node)
    }
}
