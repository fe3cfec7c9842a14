use formpath_xpath::{Error, NodeAdapter, SimpleNode, SimpleNodeAdapter};
use formpath_xforms::XFormsEvaluator;
use rstest::rstest;

// Primary instance: <data><answer>b</answer><choice/><choice>x</choice></data>
fn primary() -> SimpleNode {
    SimpleNode::doc().child(
        SimpleNode::elem("data")
            .child(SimpleNode::elem("answer").child(SimpleNode::text("b")))
            .child(SimpleNode::elem("choice"))
            .child(SimpleNode::elem("choice").child(SimpleNode::text("x"))),
    )
}

// Secondary instance: <cities><city>rome</city><city>lyon</city></cities>
fn cities() -> SimpleNode {
    SimpleNode::doc().child(
        SimpleNode::elem("cities")
            .child(SimpleNode::elem("city").child(SimpleNode::text("rome")))
            .child(SimpleNode::elem("city").child(SimpleNode::text("lyon"))),
    )
}

fn evaluator() -> XFormsEvaluator<SimpleNodeAdapter> {
    XFormsEvaluator::builder(SimpleNodeAdapter)
        .with_secondary_instance("cities", cities())
        .build()
        .unwrap()
}

#[test]
fn instance_reaches_registered_secondary_instances() {
    let doc = primary();
    let e = evaluator();
    assert_eq!(
        e.evaluate_number("count(instance('cities')/cities/city)", Some(&doc))
            .unwrap(),
        2.0
    );
    assert_eq!(
        e.evaluate_string("instance('cities')/cities/city[2]", Some(&doc))
            .unwrap(),
        "lyon"
    );
}

#[test]
fn unknown_instance_selects_nothing() {
    let doc = primary();
    assert_eq!(
        evaluator()
            .evaluate_number("count(instance('nope'))", Some(&doc))
            .unwrap(),
        0.0
    );
}

#[test]
fn current_refers_to_the_call_site_context() {
    // From inside a predicate over another tree, current() still points at
    // the node evaluation started from.
    let doc = primary();
    let e = evaluator();
    let answer = e.evaluate_node("/data/answer", Some(&doc)).unwrap().unwrap();
    let nodes = e
        .evaluate_nodes(
            "instance('cities')/cities/city[string-length(current()) = 1]",
            Some(&answer),
        )
        .unwrap();
    assert_eq!(nodes.len(), 2);
    let nodes = e
        .evaluate_nodes(
            "instance('cities')/cities/city[. = current()]",
            Some(&answer),
        )
        .unwrap();
    assert!(nodes.is_empty());
}

#[rstest]
#[case("selected('a b c', 'b')", true)]
#[case("selected('a b c', 'd')", false)]
#[case("selected('ab c', 'a')", false)]
#[case("boolean-from-string('true')", true)]
#[case("boolean-from-string('1')", true)]
#[case("boolean-from-string('TRUE')", false)]
#[case("boolean-from-string('0')", false)]
fn boolean_helpers(#[case] expression: &str, #[case] expected: bool) {
    let doc = primary();
    assert_eq!(
        evaluator().evaluate_boolean(expression, Some(&doc)).unwrap(),
        expected
    );
}

#[rstest]
#[case("selected-at('a b c', 1)", "b")]
#[case("selected-at('a b c', 1.7)", "b")]
#[case("selected-at('a b c', 5)", "")]
#[case("selected-at('a b c', -1)", "")]
#[case("coalesce('', 'fallback')", "fallback")]
#[case("coalesce('first', 'fallback')", "first")]
#[case("if(1 < 2, 'yes', 'no')", "yes")]
#[case("if(2 < 1, 'yes', 'no')", "no")]
fn string_helpers(#[case] expression: &str, #[case] expected: &str) {
    let doc = primary();
    assert_eq!(
        evaluator().evaluate_string(expression, Some(&doc)).unwrap(),
        expected
    );
}

#[test]
fn count_helpers() {
    let doc = primary();
    let e = evaluator();
    assert_eq!(
        e.evaluate_number("count-selected('a  b c')", Some(&doc)).unwrap(),
        3.0
    );
    // Only the second <choice> holds a value.
    assert_eq!(
        e.evaluate_number("count-non-empty(/data/choice)", Some(&doc)).unwrap(),
        1.0
    );
}

#[test]
fn join_flattens_node_sets() {
    let doc = primary();
    let e = evaluator();
    assert_eq!(
        e.evaluate_string(
            "join(', ', instance('cities')/cities/city)",
            Some(&doc)
        )
        .unwrap(),
        "rome, lyon"
    );
    assert_eq!(e.evaluate_string("join('-')", Some(&doc)).unwrap(), "");
}

#[test]
fn domain_defaults_sit_before_the_core_library() {
    let doc = primary();
    let e = evaluator();
    // ODK names resolve unprefixed through the default chain.
    assert_eq!(e.evaluate_number("abs(-3)", Some(&doc)).unwrap(), 3.0);
    // Core names still resolve at the end of the chain.
    assert_eq!(e.evaluate_number("string-length('ab')", Some(&doc)).unwrap(), 2.0);
    // Explicit prefixes address one library only.
    assert!(e.evaluate_boolean("xf:selected('a', 'a')", Some(&doc)).unwrap());
    let err = e.evaluate_number("xf:abs(-3)", Some(&doc)).unwrap_err();
    assert!(matches!(err, Error::UnknownFunction { .. }));
}

#[test]
fn evaluator_surface_passes_through() {
    // Deref exposes the plain evaluate* API.
    let doc = primary();
    let e = evaluator();
    let node = e.evaluate_required_element("/data/answer", Some(&doc)).unwrap();
    assert_eq!(SimpleNodeAdapter.string_value(&node), "b");
}
