use formpath_xpath::{Evaluator, NodeAdapter, SimpleNode, SimpleNodeAdapter};
use rstest::rstest;

// <root>
//   <item n="1">alpha</item>
//   <item n="2">beta<sub>deep</sub></item>
//   <item n="3">gamma</item>
//   <tail/>
// </root>
fn sample() -> SimpleNode {
    SimpleNode::doc().child(
        SimpleNode::elem("root")
            .child(
                SimpleNode::elem("item")
                    .with_attr(SimpleNode::attr("n", "1"))
                    .child(SimpleNode::text("alpha")),
            )
            .child(
                SimpleNode::elem("item")
                    .with_attr(SimpleNode::attr("n", "2"))
                    .child(SimpleNode::text("beta"))
                    .child(SimpleNode::elem("sub").child(SimpleNode::text("deep"))),
            )
            .child(
                SimpleNode::elem("item")
                    .with_attr(SimpleNode::attr("n", "3"))
                    .child(SimpleNode::text("gamma")),
            )
            .child(SimpleNode::elem("tail")),
    )
}

fn evaluator() -> Evaluator<SimpleNodeAdapter> {
    Evaluator::new(SimpleNodeAdapter)
}

fn strings(expression: &str, context: &SimpleNode) -> Vec<String> {
    evaluator()
        .evaluate_nodes(expression, Some(context))
        .unwrap()
        .iter()
        .map(|n| SimpleNodeAdapter.string_value(n))
        .collect()
}

#[rstest]
#[case("/root/item", 3)]
#[case("//item", 3)]
#[case("//sub", 1)]
#[case("/root//text()", 4)]
#[case("//item/@n", 3)]
#[case("//@*", 3)]
#[case("/descendant-or-self::node()", 11)]
fn selection_counts(#[case] expression: &str, #[case] expected: usize) {
    let doc = sample();
    let n = evaluator().evaluate_number(&format!("count({expression})"), Some(&doc));
    assert_eq!(n.unwrap(), expected as f64);
}

#[test]
fn numeric_predicate_is_a_position_test() {
    let doc = sample();
    assert_eq!(strings("/root/item[2]", &doc), ["betadeep"]);
    assert_eq!(strings("/root/item[last()]", &doc), ["gamma"]);
    assert_eq!(
        strings("/root/item[position() < 3]", &doc),
        ["alpha", "betadeep"]
    );
}

#[test]
fn attribute_predicates() {
    let doc = sample();
    assert_eq!(strings("/root/item[@n = '2']", &doc), ["betadeep"]);
    assert_eq!(strings("/root/item[@n > 1]", &doc), ["betadeep", "gamma"]);
}

#[test]
fn reverse_axes_count_proximity_from_the_context_node() {
    let doc = sample();
    let e = evaluator();
    let third = e.evaluate_node("/root/item[3]", Some(&doc)).unwrap().unwrap();
    // Nearest preceding sibling first.
    assert_eq!(
        strings("preceding-sibling::item[1]", &third),
        ["betadeep"]
    );
    let deep = e.evaluate_node("//sub", Some(&doc)).unwrap().unwrap();
    assert_eq!(strings("ancestor::*[1]", &deep), ["betadeep"]);
    assert_eq!(strings("ancestor::*[2]", &deep), ["alphabetadeepgamma"]);
}

#[test]
fn following_and_preceding_partition_the_document() {
    let doc = sample();
    let e = evaluator();
    let second = e.evaluate_node("/root/item[2]", Some(&doc)).unwrap().unwrap();
    // Descendants of the context node are not following nodes.
    assert_eq!(
        strings("following::*", &second),
        ["gamma", ""]
    );
    // Ancestors are not preceding nodes; preceding excludes its own subtree.
    assert_eq!(strings("preceding::*", &second), ["alpha"]);
    assert_eq!(strings("following-sibling::*", &second), ["gamma", ""]);
}

#[test]
fn parent_and_self_abbreviations() {
    let doc = sample();
    let e = evaluator();
    let deep = e.evaluate_node("//sub", Some(&doc)).unwrap().unwrap();
    assert_eq!(strings("..", &deep), ["betadeep"]);
    assert_eq!(strings(".", &deep), ["deep"]);
    assert_eq!(strings("../..", &deep), ["alphabetadeepgamma"]);
}

#[test]
fn union_deduplicates_in_document_order() {
    let doc = sample();
    assert_eq!(
        strings("/root/item[3] | /root/item[1] | /root/item[1]", &doc),
        ["alpha", "gamma"]
    );
}

#[test]
fn double_slash_walks_from_filter_results() {
    let doc = sample();
    assert_eq!(strings("/root/item[2]//text()", &doc), ["beta", "deep"]);
}

#[test]
fn name_test_with_wildcard() {
    let doc = sample();
    assert_eq!(
        strings("/root/*", &doc),
        ["alpha", "betadeep", "gamma", ""]
    );
}

#[test]
fn path_from_relative_context() {
    let doc = sample();
    let e = evaluator();
    let second = e.evaluate_node("/root/item[2]", Some(&doc)).unwrap().unwrap();
    assert_eq!(strings("sub", &second), ["deep"]);
    // Absolute paths ignore the context node and restart at the document.
    assert_eq!(strings("/root/tail", &second), [""]);
}
