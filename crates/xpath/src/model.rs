//! Node-kind model and the adapter contract.
//!
//! The adapter is the only point of contact between the evaluator and a
//! concrete tree. The evaluator never inspects a node except through the
//! operations defined here, which is what lets one engine run unmodified over
//! a browser-style document, a server-side XML object, or an in-memory form
//! instance.

use core::cmp::Ordering;
use core::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Closed classification of tree nodes.
///
/// The seven XPath 1.0 kinds plus [`NodeKind::NonXPath`], an escape hatch for
/// tree members outside the XPath data model (document-type nodes and the
/// like). A node has exactly one kind at any time; the escape kind never
/// satisfies [`NodeAdapter::is_xpath_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    /// Namespace declaration. Textually an attribute, but a name in the
    /// `xmlns` namespace classifies here, never as `Attribute`.
    Namespace,
    Attribute,
    /// Unifies plain text and CDATA.
    Text,
    Comment,
    ProcessingInstruction,
    /// Tree members outside the XPath data model. Never selected by name
    /// tests and skipped by `node()` wildcard matches.
    NonXPath,
}

impl NodeKind {
    /// Whether this kind belongs to the XPath data model.
    pub fn is_xpath(self) -> bool {
        self != NodeKind::NonXPath
    }
}

/// Expanded node name: syntactic prefix, local part, resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        QName {
            prefix: None,
            local: local.into(),
            ns_uri: None,
        }
    }

    /// The name as written, `prefix:local` or bare `local`.
    pub fn lexical(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.local),
            None => self.local.clone(),
        }
    }
}

/// The sole translation layer between the evaluator and a concrete tree.
///
/// Nodes are opaque handles; cloning one must be cheap (reference-style) and
/// equality must mean "same node", not structural equality.
///
/// # Contract
///
/// Every operation may assume its argument already passed
/// [`is_xpath_node`](Self::is_xpath_node) at the evaluator boundary; handing
/// an adapter a foreign value is a programmer error and may panic. Optional
/// fast paths are pure optimizations — their absence must not change
/// evaluation results, only performance.
pub trait NodeAdapter {
    type Node: Clone + Eq + Hash + fmt::Debug + 'static;

    /// Total over all valid nodes.
    fn node_kind(&self, node: &Self::Node) -> NodeKind;

    /// Name for element, attribute, namespace and PI nodes; `None` otherwise.
    fn node_name(&self, node: &Self::Node) -> Option<QName>;

    /// Namespace URI; defined for element and attribute kinds only.
    fn namespace_uri(&self, node: &Self::Node) -> Option<String>;

    /// The XPath 1.0 string-value of the node, per its kind's rules
    /// (element/document: concatenated descendant text; attribute, text,
    /// comment, PI: own textual content).
    fn string_value(&self, node: &Self::Node) -> String;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;
    fn attributes(&self, node: &Self::Node) -> Vec<Self::Node>;
    fn namespace_declarations(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// The document node containing `node`. Must succeed for any node
    /// reachable from an attached tree and must return a node classifying as
    /// [`NodeKind::Document`].
    fn containing_document(&self, node: &Self::Node) -> Self::Node;

    /// Scope-sensitive prefix lookup, asking the tree itself. A `None` prefix
    /// asks for the default namespace in scope at `scope`.
    fn lookup_namespace_uri(&self, scope: &Self::Node, prefix: Option<&str>) -> Option<String>;

    /// Rejects the escape kind and, for adapters over looser host types, any
    /// non-tree value.
    fn is_xpath_node(&self, node: &Self::Node) -> bool {
        self.node_kind(node).is_xpath()
    }

    // ----- optional fast paths -----

    /// Value of a no-namespace attribute by local name.
    fn local_named_attribute_value(&self, element: &Self::Node, local: &str) -> Option<String> {
        self.attributes(element).into_iter().find_map(|a| {
            let name = self.node_name(&a)?;
            (name.local == local && self.namespace_uri(&a).is_none())
                .then(|| self.string_value(&a))
        })
    }

    fn has_local_named_attribute(&self, element: &Self::Node, local: &str) -> bool {
        self.local_named_attribute_value(element, local).is_some()
    }

    /// Child elements with the given local name, in document order.
    fn children_by_local_name(&self, node: &Self::Node, local: &str) -> Vec<Self::Node> {
        self.children(node)
            .into_iter()
            .filter(|c| {
                self.node_kind(c) == NodeKind::Element
                    && self.node_name(c).is_some_and(|n| n.local == local)
            })
            .collect()
    }

    /// Document order comparison. The default uses ancestry and stable
    /// sibling order; adapters with a cheaper total order (preorder index)
    /// should override it.
    fn compare_document_order(&self, a: &Self::Node, b: &Self::Node) -> Ordering {
        compare_by_ancestry(self, a, b)
    }
}

/// Fallback comparator for document order based on ancestry and stable
/// sibling ordering.
///
/// - If one node is an ancestor of the other, the ancestor precedes the
///   descendant.
/// - Among siblings, attributes come first, then namespaces, then child
///   nodes; within each group the adapter's order is preserved.
/// - Nodes from different roots have no document order; they are
///   tie-broken on the root's hash so mixed-tree unions sort
///   deterministically within a process. Adapters with a meaningful
///   cross-tree order should override `compare_document_order`.
pub fn compare_by_ancestry<A: NodeAdapter + ?Sized>(
    adapter: &A,
    a: &A::Node,
    b: &A::Node,
) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    fn path_to_root<A: NodeAdapter + ?Sized>(adapter: &A, node: &A::Node) -> Vec<A::Node> {
        let mut path = vec![node.clone()];
        let mut cur = node.clone();
        while let Some(parent) = adapter.parent(&cur) {
            path.push(parent.clone());
            cur = parent;
        }
        path.reverse();
        path
    }
    let pa = path_to_root(adapter, a);
    let pb = path_to_root(adapter, b);
    let shared = core::cmp::min(pa.len(), pb.len());
    let mut i = 0;
    while i < shared && pa[i] == pb[i] {
        i += 1;
    }
    if i == shared {
        // One path is a prefix of the other: the shorter is the ancestor.
        return pa.len().cmp(&pb.len());
    }
    if i == 0 {
        // Different roots: order by root identity so the result is at
        // least total and repeatable.
        fn identity_hash(node: &impl Hash) -> u64 {
            let mut hasher = DefaultHasher::new();
            node.hash(&mut hasher);
            hasher.finish()
        }
        return identity_hash(&pa[0]).cmp(&identity_hash(&pb[0]));
    }
    let parent = &pa[i - 1];
    let mut siblings: Vec<A::Node> = adapter.attributes(parent);
    siblings.extend(adapter.namespace_declarations(parent));
    siblings.extend(adapter.children(parent));
    let pos_a = siblings.iter().position(|n| n == &pa[i]);
    let pos_b = siblings.iter().position(|n| n == &pb[i]);
    match (pos_a, pos_b) {
        (Some(ia), Some(ib)) => ia.cmp(&ib),
        _ => Ordering::Equal,
    }
}
