use std::rc::Rc;

use formpath_xpath::{
    Error, Evaluator, FunctionLibrary, PrefixResolver, ResultType, SimpleNode,
    SimpleNodeAdapter, Value,
};

fn demo_library() -> FunctionLibrary<SimpleNodeAdapter> {
    let mut lib: FunctionLibrary<SimpleNodeAdapter> = FunctionLibrary::new("urn:demo");
    lib.register("double", 1, Some(1), |ctx, args| {
        Ok(Value::Number(args[0].number(ctx.adapter()) * 2.0))
    });
    // Same local name as a core function.
    lib.register("count", 1, Some(1), |_, _| Ok(Value::Number(42.0)));
    lib
}

fn doc() -> SimpleNode {
    SimpleNode::doc().child(
        SimpleNode::elem("root")
            .child(SimpleNode::elem("a"))
            .child(SimpleNode::elem("b")),
    )
}

fn demo_resolver() -> Rc<dyn PrefixResolver> {
    Rc::new(|prefix: Option<&str>| (prefix == Some("d")).then(|| "urn:demo".to_string()))
}

#[test]
fn non_default_library_requires_a_prefix() {
    let e = Evaluator::builder(SimpleNodeAdapter)
        .with_function_library(demo_library())
        .build()
        .unwrap();
    let doc = doc();
    let result = e
        .evaluate("d:double(21)", Some(&doc), Some(demo_resolver()), ResultType::Number)
        .unwrap();
    assert_eq!(result.number(), Some(42.0));

    let err = e.evaluate_number("double(21)", Some(&doc)).unwrap_err();
    assert!(matches!(err, Error::UnknownFunction { name } if name == "double"));
}

#[test]
fn default_library_shadows_core_without_hiding_it() {
    let e = Evaluator::builder(SimpleNodeAdapter)
        .with_default_function_library(demo_library())
        .build()
        .unwrap();
    let doc = doc();
    // Unprefixed call hits the earlier default library.
    assert_eq!(e.evaluate_number("count(/root/*)", Some(&doc)).unwrap(), 42.0);
    // The core implementation stays reachable by explicit namespace.
    assert_eq!(e.evaluate_number("fn:count(/root/*)", Some(&doc)).unwrap(), 2.0);
    // Unshadowed core names still fall through the chain.
    assert_eq!(e.evaluate_number("string-length('abc')", Some(&doc)).unwrap(), 3.0);
}

#[test]
fn explicit_namespace_never_falls_back() {
    let e = Evaluator::builder(SimpleNodeAdapter)
        .with_function_library(demo_library())
        .build()
        .unwrap();
    let doc = doc();
    let err = e
        .evaluate(
            "d:string-length('abc')",
            Some(&doc),
            Some(demo_resolver()),
            ResultType::Number,
        )
        .unwrap_err();
    assert!(matches!(err, Error::UnknownFunction { .. }));
}

#[test]
fn unregistered_namespace_is_a_distinct_error() {
    let e = Evaluator::new(SimpleNodeAdapter);
    let doc = doc();
    let resolver: Rc<dyn PrefixResolver> =
        Rc::new(|prefix: Option<&str>| (prefix == Some("p")).then(|| "urn:nowhere".to_string()));
    let err = e
        .evaluate("p:foo()", Some(&doc), Some(resolver), ResultType::Any)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownFunctionLibrary { namespace } if namespace == "urn:nowhere"));
}

#[test]
fn unresolvable_prefix_falls_back_to_the_default_chain() {
    // `zz` resolves nowhere, but the local name exists in the defaults.
    let e = Evaluator::new(SimpleNodeAdapter);
    let doc = doc();
    assert!(e.evaluate_boolean("zz:true()", Some(&doc)).unwrap());
}

#[test]
fn arity_is_validated() {
    let e = Evaluator::new(SimpleNodeAdapter);
    let doc = doc();
    let err = e.evaluate_number("count()", Some(&doc)).unwrap_err();
    assert!(matches!(
        err,
        Error::FunctionArity { name, actual: 0, .. } if name == "count"
    ));
    let err = e.evaluate_string("concat('a')", Some(&doc)).unwrap_err();
    assert!(matches!(err, Error::FunctionArity { .. }));
}

#[test]
fn duplicate_namespace_registration_fails_at_build() {
    let Err(err) = Evaluator::builder(SimpleNodeAdapter)
        .with_function_library(demo_library())
        .with_function_library(demo_library())
        .build()
    else {
        panic!("duplicate namespace accepted");
    };
    assert!(matches!(err, Error::DuplicateFunctionLibrary(ns) if ns == "urn:demo"));
}
