//! A small reference-counted tree with a matching adapter.
//!
//! Ships with the crate as both a worked example of the adapter contract and
//! the tree used by the test suite. Not intended as a production DOM: no
//! parsing, no serialization, interior mutability everywhere.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use crate::consts::XMLNS_NS;
use crate::model::{NodeAdapter, NodeKind, QName};

struct Inner {
    kind: NodeKind,
    name: Option<QName>,
    value: RefCell<String>,
    parent: RefCell<Weak<Inner>>,
    children: RefCell<Vec<SimpleNode>>,
    attributes: RefCell<Vec<SimpleNode>>,
    namespaces: RefCell<Vec<SimpleNode>>,
}

/// A node handle. Cloning is cheap; equality and hashing are by node
/// identity, not structure.
#[derive(Clone)]
pub struct SimpleNode(Rc<Inner>);

impl PartialEq for SimpleNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SimpleNode {}

impl Hash for SimpleNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for SimpleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("SimpleNode");
        d.field("kind", &self.0.kind);
        if let Some(name) = &self.0.name {
            d.field("name", &name.lexical());
        }
        let value = self.0.value.borrow();
        if !value.is_empty() {
            d.field("value", &*value);
        }
        d.finish()
    }
}

impl SimpleNode {
    fn new(kind: NodeKind, name: Option<QName>, value: impl Into<String>) -> Self {
        SimpleNode(Rc::new(Inner {
            kind,
            name,
            value: RefCell::new(value.into()),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            attributes: RefCell::new(Vec::new()),
            namespaces: RefCell::new(Vec::new()),
        }))
    }

    pub fn doc() -> Self {
        SimpleNode::new(NodeKind::Document, None, "")
    }

    pub fn elem(local: impl Into<String>) -> Self {
        SimpleNode::new(NodeKind::Element, Some(QName::local(local)), "")
    }

    pub fn elem_ns(
        prefix: Option<&str>,
        local: impl Into<String>,
        ns_uri: impl Into<String>,
    ) -> Self {
        let name = QName {
            prefix: prefix.map(str::to_string),
            local: local.into(),
            ns_uri: Some(ns_uri.into()),
        };
        SimpleNode::new(NodeKind::Element, Some(name), "")
    }

    pub fn attr(local: impl Into<String>, value: impl Into<String>) -> Self {
        SimpleNode::new(NodeKind::Attribute, Some(QName::local(local)), value)
    }

    pub fn attr_ns(
        prefix: Option<&str>,
        local: impl Into<String>,
        ns_uri: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let local = local.into();
        let ns_uri = ns_uri.into();
        // Names in the xmlns namespace classify as namespace nodes.
        let kind = if ns_uri == XMLNS_NS {
            NodeKind::Namespace
        } else {
            NodeKind::Attribute
        };
        let name = QName {
            prefix: prefix.map(str::to_string),
            local,
            ns_uri: Some(ns_uri),
        };
        SimpleNode::new(kind, Some(name), value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        SimpleNode::new(NodeKind::Text, None, value)
    }

    /// CDATA sections carry no distinct kind; they are text.
    pub fn cdata(value: impl Into<String>) -> Self {
        SimpleNode::text(value)
    }

    pub fn comment(value: impl Into<String>) -> Self {
        SimpleNode::new(NodeKind::Comment, None, value)
    }

    pub fn pi(target: impl Into<String>, value: impl Into<String>) -> Self {
        SimpleNode::new(
            NodeKind::ProcessingInstruction,
            Some(QName::local(target)),
            value,
        )
    }

    /// A namespace declaration. `None` declares the default namespace.
    pub fn ns_decl(prefix: Option<&str>, uri: impl Into<String>) -> Self {
        let name = QName {
            prefix: None,
            local: prefix.unwrap_or_default().to_string(),
            ns_uri: Some(XMLNS_NS.to_string()),
        };
        SimpleNode::new(NodeKind::Namespace, Some(name), uri)
    }

    /// A node outside the XPath data model, standing in for document-type
    /// declarations and similar tree members.
    pub fn non_xpath() -> Self {
        SimpleNode::new(NodeKind::NonXPath, None, "")
    }

    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    /// Attach `child` (also used for attaching the escape kind); returns
    /// `self` for chaining.
    pub fn child(self, child: SimpleNode) -> Self {
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child);
        self
    }

    pub fn with_attr(self, attr: SimpleNode) -> Self {
        *attr.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        match attr.0.kind {
            NodeKind::Namespace => self.0.namespaces.borrow_mut().push(attr),
            _ => self.0.attributes.borrow_mut().push(attr),
        }
        self
    }

    pub fn set_value(&self, value: impl Into<String>) {
        *self.0.value.borrow_mut() = value.into();
    }

    fn parent(&self) -> Option<SimpleNode> {
        self.0.parent.borrow().upgrade().map(SimpleNode)
    }

    fn string_value(&self) -> String {
        match self.0.kind {
            NodeKind::Document | NodeKind::Element => {
                let mut out = String::new();
                collect_text(self, &mut out);
                out
            }
            _ => self.0.value.borrow().clone(),
        }
    }
}

fn collect_text(node: &SimpleNode, out: &mut String) {
    for child in node.0.children.borrow().iter() {
        match child.0.kind {
            NodeKind::Text => out.push_str(&child.0.value.borrow()),
            NodeKind::Element => collect_text(child, out),
            _ => {}
        }
    }
}

/// Adapter over [`SimpleNode`] trees.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleNodeAdapter;

impl NodeAdapter for SimpleNodeAdapter {
    type Node = SimpleNode;

    fn node_kind(&self, node: &SimpleNode) -> NodeKind {
        node.0.kind
    }

    fn node_name(&self, node: &SimpleNode) -> Option<QName> {
        node.0.name.clone()
    }

    fn namespace_uri(&self, node: &SimpleNode) -> Option<String> {
        match node.0.kind {
            NodeKind::Element | NodeKind::Attribute => {
                node.0.name.as_ref().and_then(|n| n.ns_uri.clone())
            }
            _ => None,
        }
    }

    fn string_value(&self, node: &SimpleNode) -> String {
        node.string_value()
    }

    fn parent(&self, node: &SimpleNode) -> Option<SimpleNode> {
        node.parent()
    }

    fn children(&self, node: &SimpleNode) -> Vec<SimpleNode> {
        node.0.children.borrow().clone()
    }

    fn attributes(&self, node: &SimpleNode) -> Vec<SimpleNode> {
        node.0.attributes.borrow().clone()
    }

    fn namespace_declarations(&self, node: &SimpleNode) -> Vec<SimpleNode> {
        node.0.namespaces.borrow().clone()
    }

    fn containing_document(&self, node: &SimpleNode) -> SimpleNode {
        let mut cur = node.clone();
        while let Some(parent) = cur.parent() {
            cur = parent;
        }
        cur
    }

    fn lookup_namespace_uri(&self, scope: &SimpleNode, prefix: Option<&str>) -> Option<String> {
        let wanted = prefix.unwrap_or_default();
        let mut cursor = Some(scope.clone());
        while let Some(node) = cursor {
            if node.0.kind == NodeKind::Element {
                for decl in node.0.namespaces.borrow().iter() {
                    if decl.0.name.as_ref().is_some_and(|n| n.local == wanted) {
                        return Some(decl.0.value.borrow().clone());
                    }
                }
            }
            cursor = node.parent();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_value_concatenates_descendant_text() {
        let tree = SimpleNode::elem("a")
            .child(SimpleNode::text("one"))
            .child(
                SimpleNode::elem("b")
                    .child(SimpleNode::comment("skipped"))
                    .child(SimpleNode::text("two")),
            );
        assert_eq!(tree.string_value(), "onetwo");
    }

    #[test]
    fn xmlns_attributes_classify_as_namespace_nodes() {
        let decl = SimpleNode::attr_ns(Some("xmlns"), "x", XMLNS_NS, "urn:x");
        assert_eq!(decl.kind(), NodeKind::Namespace);
        let elem = SimpleNode::elem("a").with_attr(decl);
        let adapter = SimpleNodeAdapter;
        assert!(adapter.attributes(&elem).is_empty());
        assert_eq!(adapter.namespace_declarations(&elem).len(), 1);
    }

    #[test]
    fn fast_path_defaults_agree_with_the_general_operations() {
        let elem = SimpleNode::elem("row")
            .with_attr(SimpleNode::attr("id", "r1"))
            .with_attr(SimpleNode::attr_ns(Some("x"), "id", "urn:x", "other"))
            .child(SimpleNode::elem("cell"))
            .child(SimpleNode::text("gap"))
            .child(SimpleNode::elem("cell"));
        let adapter = SimpleNodeAdapter;
        // Only the no-namespace attribute counts.
        assert_eq!(
            adapter.local_named_attribute_value(&elem, "id").as_deref(),
            Some("r1")
        );
        assert!(adapter.has_local_named_attribute(&elem, "id"));
        assert!(!adapter.has_local_named_attribute(&elem, "missing"));
        assert_eq!(adapter.children_by_local_name(&elem, "cell").len(), 2);
    }

    #[test]
    fn cross_tree_ordering_is_total_and_repeatable() {
        use std::cmp::Ordering;

        let a = SimpleNode::elem("a").child(SimpleNode::text("1"));
        let b = SimpleNode::elem("b").child(SimpleNode::text("2"));
        let doc_a = SimpleNode::doc().child(a.clone());
        let doc_b = SimpleNode::doc().child(b.clone());
        let adapter = SimpleNodeAdapter;

        let forward = adapter.compare_document_order(&a, &b);
        assert_ne!(forward, Ordering::Equal);
        assert_eq!(adapter.compare_document_order(&b, &a), forward.reverse());
        // Stable across calls and consistent with the roots' own order.
        assert_eq!(adapter.compare_document_order(&a, &b), forward);
        assert_eq!(adapter.compare_document_order(&doc_a, &doc_b), forward);
    }

    #[test]
    fn prefix_lookup_walks_ancestors() {
        let child = SimpleNode::elem("inner");
        let _root = SimpleNode::elem("outer")
            .with_attr(SimpleNode::ns_decl(Some("x"), "urn:outer"))
            .child(child.clone());
        let adapter = SimpleNodeAdapter;
        assert_eq!(
            adapter.lookup_namespace_uri(&child, Some("x")).as_deref(),
            Some("urn:outer")
        );
        assert_eq!(adapter.lookup_namespace_uri(&child, Some("y")), None);
    }
}
