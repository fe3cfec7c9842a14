//! Expression-tree evaluation: axes, node tests, predicates, operators and
//! the XPath 1.0 comparison rules.

use std::collections::HashSet;

use smallvec::SmallVec;

use crate::context::EvaluationContext;
use crate::error::Error;
use crate::model::{NodeAdapter, NodeKind};
use crate::parser::ast::{
    Axis, BinaryOp, Expr, KindTest, Literal, NodeTest, PathExpr, PathStart, Step,
};
use crate::value::Value;

type Candidates<N> = SmallVec<[N; 8]>;

pub(crate) fn evaluate_expr<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    expr: &Expr,
) -> Result<Value<A::Node>, Error> {
    match expr {
        Expr::Literal(Literal::Number(n)) => Ok(Value::Number(*n)),
        Expr::Literal(Literal::String(s)) => Ok(Value::String(s.clone())),
        Expr::VarRef(name) => Err(Error::UnknownVariable {
            name: name.lexical(),
        }),
        Expr::FunctionCall { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate_expr(ctx, arg)?);
            }
            let entry = ctx.functions().implementation_for_call(
                ctx,
                name.prefix.as_deref(),
                &name.local,
            )?;
            entry.call(ctx, &name.lexical(), &values)
        }
        Expr::Negate(inner) => {
            let v = evaluate_expr(ctx, inner)?;
            Ok(Value::Number(-v.number(ctx.adapter())))
        }
        Expr::Binary { left, op, right } => evaluate_binary(ctx, left, *op, right),
        Expr::Union { left, right } => {
            let l = evaluate_expr(ctx, left)?.into_node_set("union")?;
            let r = evaluate_expr(ctx, right)?.into_node_set("union")?;
            let mut nodes = l;
            nodes.extend(r);
            sort_document_order(ctx.adapter(), &mut nodes);
            Ok(Value::NodeSet(nodes))
        }
        Expr::Filter {
            primary,
            predicates,
        } => {
            let nodes = evaluate_expr(ctx, primary)?
                .into_node_set("a predicate")?;
            let mut candidates: Candidates<A::Node> = nodes.into_iter().collect();
            for predicate in predicates {
                candidates = filter_by_predicate(ctx, candidates, predicate)?;
            }
            Ok(Value::NodeSet(candidates.into_vec()))
        }
        Expr::Path(path) => evaluate_path(ctx, path),
    }
}

fn evaluate_binary<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    left: &Expr,
    op: BinaryOp,
    right: &Expr,
) -> Result<Value<A::Node>, Error> {
    match op {
        BinaryOp::Or => {
            if evaluate_expr(ctx, left)?.boolean() {
                return Ok(Value::Boolean(true));
            }
            Ok(Value::Boolean(evaluate_expr(ctx, right)?.boolean()))
        }
        BinaryOp::And => {
            if !evaluate_expr(ctx, left)?.boolean() {
                return Ok(Value::Boolean(false));
            }
            Ok(Value::Boolean(evaluate_expr(ctx, right)?.boolean()))
        }
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let l = evaluate_expr(ctx, left)?;
            let r = evaluate_expr(ctx, right)?;
            Ok(Value::Boolean(compare(ctx, op, &l, &r)))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let l = evaluate_expr(ctx, left)?.number(ctx.adapter());
            let r = evaluate_expr(ctx, right)?.number(ctx.adapter());
            let result = match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                // IEEE semantics: x div 0 is ±Infinity, 0 div 0 is NaN.
                BinaryOp::Div => l / r,
                BinaryOp::Mod => l % r,
                _ => unreachable!("arithmetic operator"),
            };
            Ok(Value::Number(result))
        }
    }
}

/// XPath 1.0 §3.4 comparison rules, including the existential semantics for
/// node-set operands.
fn compare<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    op: BinaryOp,
    left: &Value<A::Node>,
    right: &Value<A::Node>,
) -> bool {
    let adapter = ctx.adapter();
    match (left, right) {
        (Value::NodeSet(l), Value::NodeSet(r)) => {
            // Some pair of nodes whose string-values satisfy the comparison.
            l.iter().any(|ln| {
                let ls = adapter.string_value(ln);
                r.iter().any(|rn| {
                    let rs = adapter.string_value(rn);
                    match op {
                        BinaryOp::Eq => ls == rs,
                        BinaryOp::Ne => ls != rs,
                        _ => compare_numbers(op, crate::value::number_from_str(&ls), {
                            crate::value::number_from_str(&rs)
                        }),
                    }
                })
            })
        }
        (Value::NodeSet(nodes), other) | (other, Value::NodeSet(nodes)) => {
            let flipped = !matches!(left, Value::NodeSet(_));
            match other {
                Value::Boolean(b) => {
                    let set = !nodes.is_empty();
                    let (l, r) = if flipped { (*b, set) } else { (set, *b) };
                    compare_booleans(op, l, r)
                }
                Value::Number(n) => nodes.iter().any(|node| {
                    let v = crate::value::number_from_str(&adapter.string_value(node));
                    let (l, r) = if flipped { (*n, v) } else { (v, *n) };
                    compare_numbers(op, l, r)
                }),
                Value::String(s) => nodes.iter().any(|node| {
                    let sv = adapter.string_value(node);
                    match op {
                        BinaryOp::Eq => sv == *s,
                        BinaryOp::Ne => sv != *s,
                        _ => {
                            let v = crate::value::number_from_str(&sv);
                            let n = crate::value::number_from_str(s);
                            let (l, r) = if flipped { (n, v) } else { (v, n) };
                            compare_numbers(op, l, r)
                        }
                    }
                }),
                Value::NodeSet(_) => unreachable!("handled above"),
            }
        }
        _ => match op {
            BinaryOp::Eq | BinaryOp::Ne => {
                let equal = match (left, right) {
                    (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
                        left.boolean() == right.boolean()
                    }
                    (Value::Number(_), _) | (_, Value::Number(_)) => {
                        left.number(adapter) == right.number(adapter)
                    }
                    _ => left.string(adapter) == right.string(adapter),
                };
                if op == BinaryOp::Eq { equal } else { !equal }
            }
            _ => compare_numbers(op, left.number(adapter), right.number(adapter)),
        },
    }
}

fn compare_numbers(op: BinaryOp, l: f64, r: f64) -> bool {
    match op {
        BinaryOp::Eq => l == r,
        BinaryOp::Ne => l != r,
        BinaryOp::Lt => l < r,
        BinaryOp::Le => l <= r,
        BinaryOp::Gt => l > r,
        BinaryOp::Ge => l >= r,
        _ => unreachable!("comparison operator"),
    }
}

fn compare_booleans(op: BinaryOp, l: bool, r: bool) -> bool {
    match op {
        BinaryOp::Eq => l == r,
        BinaryOp::Ne => l != r,
        _ => compare_numbers(op, f64::from(u8::from(l)), f64::from(u8::from(r))),
    }
}

// ===== Paths =====

fn evaluate_path<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    path: &PathExpr,
) -> Result<Value<A::Node>, Error> {
    let mut current: Vec<A::Node> = match &path.start {
        PathStart::Root => vec![ctx.effective_root()],
        PathStart::Relative => vec![ctx.context_node().clone()],
        PathStart::Filter(expr) => evaluate_expr(ctx, expr)?.into_node_set("a path step")?,
    };
    for step in &path.steps {
        current = evaluate_step(ctx, &current, step)?;
    }
    Ok(Value::NodeSet(current))
}

fn evaluate_step<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    input: &[A::Node],
    step: &Step,
) -> Result<Vec<A::Node>, Error> {
    let mut out: Vec<A::Node> = Vec::new();
    for node in input {
        let mut candidates: Candidates<A::Node> = axis_candidates(ctx, node, step.axis);
        candidates = filter_by_node_test(ctx, step.axis, &step.test, candidates)?;
        for predicate in &step.predicates {
            candidates = filter_by_predicate(ctx, candidates, predicate)?;
        }
        out.extend(candidates);
    }
    sort_document_order(ctx.adapter(), &mut out);
    Ok(out)
}

fn filter_by_predicate<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    candidates: Candidates<A::Node>,
    predicate: &Expr,
) -> Result<Candidates<A::Node>, Error> {
    let size = candidates.len();
    let mut kept: Candidates<A::Node> = SmallVec::new();
    for (index, node) in candidates.into_iter().enumerate() {
        let focus = ctx.with_focus(node.clone(), index + 1, size);
        let value = evaluate_expr(&focus, predicate)?;
        let keep = match value {
            // A numeric predicate is a proximity-position test.
            Value::Number(n) => (index + 1) as f64 == n,
            other => other.boolean(),
        };
        if keep {
            kept.push(node);
        }
    }
    Ok(kept)
}

fn filter_by_node_test<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    axis: Axis,
    test: &NodeTest,
    candidates: Candidates<A::Node>,
) -> Result<Candidates<A::Node>, Error> {
    let mut kept: Candidates<A::Node> = SmallVec::new();
    for node in candidates {
        if node_test_matches(ctx, axis, test, &node)? {
            kept.push(node);
        }
    }
    Ok(kept)
}

/// Principal node kind of an axis: attributes for the attribute axis,
/// namespace nodes for the namespace axis, elements for everything else.
fn principal_kind(axis: Axis) -> NodeKind {
    match axis {
        Axis::Attribute => NodeKind::Attribute,
        Axis::Namespace => NodeKind::Namespace,
        _ => NodeKind::Element,
    }
}

fn node_test_matches<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    axis: Axis,
    test: &NodeTest,
    node: &A::Node,
) -> Result<bool, Error> {
    let adapter = ctx.adapter();
    let kind = adapter.node_kind(node);
    match test {
        NodeTest::Kind(KindTest::Node) => Ok(true),
        NodeTest::Kind(KindTest::Text) => Ok(kind == NodeKind::Text),
        NodeTest::Kind(KindTest::Comment) => Ok(kind == NodeKind::Comment),
        NodeTest::Kind(KindTest::ProcessingInstruction(target)) => {
            if kind != NodeKind::ProcessingInstruction {
                return Ok(false);
            }
            match target {
                None => Ok(true),
                Some(t) => Ok(adapter.node_name(node).is_some_and(|n| n.local == *t)),
            }
        }
        NodeTest::Any => Ok(kind == principal_kind(axis)),
        NodeTest::NamespaceWildcard(prefix) => {
            if kind != principal_kind(axis) {
                return Ok(false);
            }
            let uri = ctx
                .resolver()
                .resolve(adapter, Some(prefix))
                .ok_or_else(|| {
                    Error::evaluation(format!("undefined namespace prefix {prefix}"))
                })?;
            Ok(adapter.namespace_uri(node).as_deref() == Some(uri.as_str()))
        }
        NodeTest::Name(name) => {
            if kind != principal_kind(axis) {
                return Ok(false);
            }
            // An unprefixed name test matches the null namespace, never a
            // default element namespace.
            let expected_uri = match &name.prefix {
                None => None,
                Some(p) => Some(
                    ctx.resolver()
                        .resolve(adapter, Some(p))
                        .ok_or_else(|| {
                            Error::evaluation(format!("undefined namespace prefix {p}"))
                        })?,
                ),
            };
            let Some(node_name) = adapter.node_name(node) else {
                return Ok(false);
            };
            Ok(node_name.local == name.local && adapter.namespace_uri(node) == expected_uri)
        }
    }
}

// ===== Axes =====

/// Candidates along an axis, in axis order (reverse axes in reverse document
/// order, matching proximity positions). Nodes outside the XPath data model
/// are skipped here so a `node()` wildcard can never select them.
fn axis_candidates<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    node: &A::Node,
    axis: Axis,
) -> Candidates<A::Node> {
    let adapter = ctx.adapter();
    let mut out: Candidates<A::Node> = match axis {
        Axis::SelfAxis => [node.clone()].into_iter().collect(),
        Axis::Child => adapter.children(node).into_iter().collect(),
        Axis::Attribute => adapter.attributes(node).into_iter().collect(),
        Axis::Namespace => in_scope_namespaces(ctx, node),
        Axis::Parent => ctx.parent_of(node).into_iter().collect(),
        Axis::Ancestor => {
            let mut out = SmallVec::new();
            let mut cursor = ctx.parent_of(node);
            while let Some(parent) = cursor {
                cursor = ctx.parent_of(&parent);
                out.push(parent);
            }
            out
        }
        Axis::AncestorOrSelf => {
            let mut out: Candidates<A::Node> = [node.clone()].into_iter().collect();
            out.extend(axis_candidates(ctx, node, Axis::Ancestor));
            out
        }
        Axis::Descendant => collect_descendants(adapter, node, false),
        Axis::DescendantOrSelf => collect_descendants(adapter, node, true),
        Axis::FollowingSibling => siblings(ctx, node, false),
        Axis::PrecedingSibling => siblings(ctx, node, true),
        Axis::Following => {
            // Start past the node's own subtree, then walk full document
            // order (children included) to the end of the scope.
            let mut out = SmallVec::new();
            let mut cursor = skip_subtree_successor(ctx, node);
            while let Some(next) = cursor {
                cursor = doc_successor(ctx, &next);
                out.push(next);
            }
            out
        }
        Axis::Preceding => {
            // Reverse document order, ancestors excluded.
            let mut out = SmallVec::new();
            let mut cursor = doc_predecessor(ctx, node);
            while let Some(prev) = cursor {
                cursor = doc_predecessor(ctx, &prev);
                if !is_ancestor_of(ctx, &prev, node) {
                    out.push(prev);
                }
            }
            out
        }
    };
    out.retain(|n| adapter.is_xpath_node(n));
    out
}

/// The in-scope namespace set of an element: its own declarations plus
/// inherited ones whose prefix is not redeclared closer to the element.
/// Non-elements have an empty namespace axis. The implicit `xml` binding
/// appears only when some level of the tree materializes it; prefix
/// resolution handles `xml` separately, so name tests are unaffected.
fn in_scope_namespaces<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    node: &A::Node,
) -> Candidates<A::Node> {
    let adapter = ctx.adapter();
    if adapter.node_kind(node) != NodeKind::Element {
        return SmallVec::new();
    }
    let mut out: Candidates<A::Node> = SmallVec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut cursor = Some(node.clone());
    while let Some(elem) = cursor {
        if adapter.node_kind(&elem) == NodeKind::Element {
            for decl in adapter.namespace_declarations(&elem) {
                let prefix = adapter
                    .node_name(&decl)
                    .map(|n| n.local)
                    .unwrap_or_default();
                if seen.insert(prefix) {
                    out.push(decl);
                }
            }
        }
        cursor = ctx.parent_of(&elem);
    }
    out
}

fn collect_descendants<A: NodeAdapter>(
    adapter: &A,
    node: &A::Node,
    include_self: bool,
) -> Candidates<A::Node> {
    let mut out: Candidates<A::Node> = SmallVec::new();
    if include_self {
        out.push(node.clone());
    }
    let mut stack: Vec<A::Node> = adapter.children(node);
    stack.reverse();
    while let Some(current) = stack.pop() {
        out.push(current.clone());
        let mut children = adapter.children(&current);
        children.reverse();
        stack.extend(children);
    }
    out
}

fn siblings<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    node: &A::Node,
    preceding: bool,
) -> Candidates<A::Node> {
    let adapter = ctx.adapter();
    let kind = adapter.node_kind(node);
    // Attributes and namespace nodes have no siblings.
    if matches!(kind, NodeKind::Attribute | NodeKind::Namespace) {
        return SmallVec::new();
    }
    let Some(parent) = ctx.parent_of(node) else {
        return SmallVec::new();
    };
    let siblings = adapter.children(&parent);
    let Some(index) = siblings.iter().position(|s| s == node) else {
        return SmallVec::new();
    };
    if preceding {
        // Reverse document order: nearest sibling first.
        siblings.into_iter().take(index).rev().collect()
    } else {
        siblings.into_iter().skip(index + 1).collect()
    }
}

/// Next node in document order: first child, else next sibling, else the
/// nearest ancestor's next sibling.
fn doc_successor<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    node: &A::Node,
) -> Option<A::Node> {
    if let Some(child) = ctx.adapter().children(node).into_iter().next() {
        return Some(child);
    }
    skip_subtree_successor(ctx, node)
}

/// Next node in document order that is not in `node`'s subtree.
fn skip_subtree_successor<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    node: &A::Node,
) -> Option<A::Node> {
    let mut current = node.clone();
    loop {
        if let Some(sibling) = next_sibling(ctx, &current) {
            return Some(sibling);
        }
        current = ctx.parent_of(&current)?;
    }
}

/// Previous node in document order: deepest last descendant of the previous
/// sibling, else the parent.
fn doc_predecessor<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    node: &A::Node,
) -> Option<A::Node> {
    if let Some(prev) = prev_sibling(ctx, node) {
        return Some(last_descendant(ctx.adapter(), prev));
    }
    ctx.parent_of(node)
}

fn next_sibling<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    node: &A::Node,
) -> Option<A::Node> {
    let parent = ctx.parent_of(node)?;
    let siblings = ctx.adapter().children(&parent);
    let index = siblings.iter().position(|s| s == node)?;
    siblings.get(index + 1).cloned()
}

fn prev_sibling<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    node: &A::Node,
) -> Option<A::Node> {
    let parent = ctx.parent_of(node)?;
    let siblings = ctx.adapter().children(&parent);
    let index = siblings.iter().position(|s| s == node)?;
    index.checked_sub(1).and_then(|i| siblings.get(i).cloned())
}

fn last_descendant<A: NodeAdapter>(adapter: &A, node: A::Node) -> A::Node {
    let mut current = node;
    loop {
        match adapter.children(&current).into_iter().next_back() {
            Some(child) => current = child,
            None => return current,
        }
    }
}

fn is_ancestor_of<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    candidate: &A::Node,
    node: &A::Node,
) -> bool {
    let mut cursor = ctx.parent_of(node);
    while let Some(parent) = cursor {
        if &parent == candidate {
            return true;
        }
        cursor = ctx.parent_of(&parent);
    }
    false
}

/// Sort into document order and drop duplicates. Distinct nodes that compare
/// `Equal` (unrelated roots) keep a stable relative order and survive the
/// dedup, which only removes identical neighbors.
pub(crate) fn sort_document_order<A: NodeAdapter>(adapter: &A, nodes: &mut Vec<A::Node>) {
    nodes.sort_by(|a, b| adapter.compare_document_order(a, b));
    nodes.dedup();
}
