use std::cell::RefCell;
use std::rc::Rc;

use formpath_xpath::consts::XFORMS_NS;
use formpath_xpath::{Error, Evaluator, PrefixResolver, SimpleNode, SimpleNodeAdapter};

fn evaluator() -> Evaluator<SimpleNodeAdapter> {
    Evaluator::new(SimpleNodeAdapter)
}

fn namespaced_doc() -> SimpleNode {
    SimpleNode::doc().child(
        SimpleNode::elem("root")
            .child(SimpleNode::elem_ns(Some("x"), "item", "urn:x").child(SimpleNode::text("hit")))
            .child(SimpleNode::elem("item").child(SimpleNode::text("plain"))),
    )
}

#[test]
fn external_resolver_binds_prefixes() {
    let doc = namespaced_doc();
    let resolver: Rc<dyn PrefixResolver> =
        Rc::new(|prefix: Option<&str>| (prefix == Some("x")).then(|| "urn:x".to_string()));
    let nodes = evaluator()
        .evaluate(
            "//x:item",
            Some(&doc),
            Some(resolver),
            formpath_xpath::ResultType::OrderedNodeSnapshot,
        )
        .unwrap();
    assert_eq!(nodes.nodes().map(<[SimpleNode]>::len), Some(1));
}

#[test]
fn unprefixed_name_tests_match_null_namespace_only() {
    let doc = namespaced_doc();
    assert_eq!(
        evaluator().evaluate_string("//item", Some(&doc)).unwrap(),
        "plain"
    );
}

#[test]
fn undefined_prefix_in_a_name_test_is_an_error() {
    let doc = namespaced_doc();
    let err = evaluator().evaluate_string("//zz:item", Some(&doc)).unwrap_err();
    assert!(matches!(err, Error::Evaluation(_)));
}

#[test]
fn tree_declarations_resolve_without_an_external_resolver() {
    let child = SimpleNode::elem_ns(Some("y"), "leaf", "urn:y");
    let doc = SimpleNode::doc().child(
        SimpleNode::elem("root")
            .with_attr(SimpleNode::ns_decl(Some("y"), "urn:y"))
            .child(child),
    );
    let root = evaluator().evaluate_node("/root", Some(&doc)).unwrap().unwrap();
    assert_eq!(
        evaluator()
            .evaluate_number("count(y:leaf)", Some(&root))
            .unwrap(),
        1.0
    );
}

#[test]
fn static_prefix_table_is_the_last_resort() {
    let doc = SimpleNode::doc().child(
        SimpleNode::elem("model")
            .child(SimpleNode::elem_ns(Some("xf"), "bind", XFORMS_NS)),
    );
    assert_eq!(
        evaluator()
            .evaluate_number("count(//xf:bind)", Some(&doc))
            .unwrap(),
        1.0
    );
}

#[test]
fn external_resolver_overrides_the_static_table() {
    let doc = SimpleNode::doc().child(
        SimpleNode::elem("root").child(SimpleNode::elem_ns(Some("xf"), "bind", "urn:custom")),
    );
    let resolver: Rc<dyn PrefixResolver> =
        Rc::new(|prefix: Option<&str>| (prefix == Some("xf")).then(|| "urn:custom".to_string()));
    let count = evaluator()
        .evaluate(
            "count(//xf:bind)",
            Some(&doc),
            Some(resolver),
            formpath_xpath::ResultType::Number,
        )
        .unwrap();
    assert_eq!(count.number(), Some(1.0));
}

#[test]
fn xml_prefix_cannot_be_overridden() {
    // A resolver lying about `xml` is ignored.
    let lying: Rc<dyn PrefixResolver> =
        Rc::new(|_: Option<&str>| Some("urn:evil".to_string()));
    let doc = namespaced_doc();
    let result = evaluator()
        .evaluate(
            "//xml:item",
            Some(&doc),
            Some(lying),
            formpath_xpath::ResultType::OrderedNodeSnapshot,
        )
        .unwrap();
    // `xml` resolved to the reserved URI, which no element here carries.
    assert_eq!(result.nodes().map(<[SimpleNode]>::len), Some(0));
}

#[test]
fn prefix_lookups_are_memoized_per_binding() {
    let doc = namespaced_doc();
    let calls = Rc::new(RefCell::new(0usize));
    let resolver: Rc<dyn PrefixResolver> = {
        let calls = Rc::clone(&calls);
        Rc::new(move |prefix: Option<&str>| {
            *calls.borrow_mut() += 1;
            (prefix == Some("x")).then(|| "urn:x".to_string())
        })
    };
    let e = evaluator();
    for _ in 0..3 {
        e.evaluate(
            "//x:item",
            Some(&doc),
            Some(Rc::clone(&resolver)),
            formpath_xpath::ResultType::OrderedNodeSnapshot,
        )
        .unwrap();
    }
    // Same context node, same resolver: one underlying lookup total.
    assert_eq!(*calls.borrow(), 1);
}
