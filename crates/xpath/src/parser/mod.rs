//! XPath 1.0 parser: pest grammar plus lowering into [`ast`] types.
//!
//! The parser is a boundary component: the engine only depends on the AST it
//! produces, never on pest pairs. Parsing is deterministic for identical
//! input.

use pest::Parser;
use pest::iterators::{Pair, Pairs};

use crate::error::Error;

pub mod ast;

use ast::{Axis, BinaryOp, Expr, KindTest, Literal, NodeTest, PathExpr, PathStart, Step};

#[derive(pest_derive::Parser)]
#[grammar = "xpath1.pest"]
struct XPathParser;

/// Parse an XPath 1.0 expression into its AST.
pub fn parse(input: &str) -> Result<Expr, Error> {
    let mut pairs = XPathParser::parse(Rule::xpath, input).map_err(|e| Error::Syntax {
        expression: input.to_string(),
        message: e.to_string(),
    })?;
    let xpath = next_pair(&mut pairs)?;
    let mut inner = xpath.into_inner();
    let expr = next_pair(&mut inner)?;
    lower_expr(expr)
}

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>) -> Result<Pair<'i, Rule>, Error> {
    pairs.next().ok_or_else(|| Error::Syntax {
        expression: String::new(),
        message: "malformed parse tree".to_string(),
    })
}

fn split_qname(s: &str) -> ast::QName {
    match s.split_once(':') {
        Some((prefix, local)) => ast::QName {
            prefix: Some(prefix.to_string()),
            local: local.to_string(),
        },
        None => ast::QName {
            prefix: None,
            local: s.to_string(),
        },
    }
}

fn lower_expr(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    match pair.as_rule() {
        Rule::expr | Rule::paren_expr | Rule::predicate => {
            let mut inner = pair.into_inner();
            lower_expr(next_pair(&mut inner)?)
        }
        Rule::or_expr
        | Rule::and_expr
        | Rule::equality_expr
        | Rule::relational_expr
        | Rule::additive_expr
        | Rule::multiplicative_expr => lower_binary_chain(pair),
        Rule::unary_expr => lower_unary(pair),
        Rule::union_expr => lower_union(pair),
        Rule::path_expr => {
            let mut inner = pair.into_inner();
            lower_expr(next_pair(&mut inner)?)
        }
        Rule::absolute_path => lower_absolute_path(pair),
        Rule::filter_path => lower_filter_path(pair),
        Rule::relative_path => {
            let mut steps = Vec::new();
            lower_relative_into(pair, &mut steps)?;
            Ok(Expr::Path(PathExpr {
                start: PathStart::Relative,
                steps,
            }))
        }
        Rule::primary_expr => {
            let mut inner = pair.into_inner();
            lower_expr(next_pair(&mut inner)?)
        }
        Rule::var_ref => {
            let mut inner = pair.into_inner();
            Ok(Expr::VarRef(split_qname(next_pair(&mut inner)?.as_str())))
        }
        Rule::string_literal => {
            let mut inner = pair.into_inner();
            Ok(Expr::Literal(Literal::String(
                next_pair(&mut inner)?.as_str().to_string(),
            )))
        }
        Rule::number => {
            let v = pair.as_str().parse::<f64>().map_err(|e| Error::Syntax {
                expression: pair.as_str().to_string(),
                message: e.to_string(),
            })?;
            Ok(Expr::Literal(Literal::Number(v)))
        }
        Rule::function_call => {
            let mut inner = pair.into_inner();
            let name = split_qname(next_pair(&mut inner)?.as_str());
            let args = inner.map(lower_expr).collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::FunctionCall { name, args })
        }
        rule => Err(Error::Syntax {
            expression: String::new(),
            message: format!("unexpected rule {rule:?} in parse tree"),
        }),
    }
}

fn lower_binary_chain(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let mut inner = pair.into_inner();
    let mut expr = lower_expr(next_pair(&mut inner)?)?;
    while let Some(op_pair) = inner.next() {
        let op = lower_op(&op_pair)?;
        let rhs = lower_expr(next_pair(&mut inner)?)?;
        expr = Expr::Binary {
            left: Box::new(expr),
            op,
            right: Box::new(rhs),
        };
    }
    Ok(expr)
}

fn lower_op(pair: &Pair<'_, Rule>) -> Result<BinaryOp, Error> {
    let op = match (pair.as_rule(), pair.as_str()) {
        (Rule::or_kw, _) => BinaryOp::Or,
        (Rule::and_kw, _) => BinaryOp::And,
        (Rule::equality_op, "=") => BinaryOp::Eq,
        (Rule::equality_op, _) => BinaryOp::Ne,
        (Rule::relational_op, "<") => BinaryOp::Lt,
        (Rule::relational_op, "<=") => BinaryOp::Le,
        (Rule::relational_op, ">") => BinaryOp::Gt,
        (Rule::relational_op, ">=") => BinaryOp::Ge,
        (Rule::additive_op, "+") => BinaryOp::Add,
        (Rule::additive_op, _) => BinaryOp::Sub,
        (Rule::multiplicative_op, "*") => BinaryOp::Mul,
        (Rule::multiplicative_op, "div") => BinaryOp::Div,
        (Rule::multiplicative_op, "mod") => BinaryOp::Mod,
        (rule, text) => {
            return Err(Error::Syntax {
                expression: String::new(),
                message: format!("unexpected operator {text:?} ({rule:?})"),
            });
        }
    };
    Ok(op)
}

fn lower_unary(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let mut negations = 0usize;
    let mut operand = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::minus_op => negations += 1,
            _ => operand = Some(lower_expr(p)?),
        }
    }
    let mut expr = operand.ok_or_else(|| Error::Syntax {
        expression: String::new(),
        message: "malformed unary expression".to_string(),
    })?;
    for _ in 0..negations {
        expr = Expr::Negate(Box::new(expr));
    }
    Ok(expr)
}

fn lower_union(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let mut inner = pair.into_inner();
    let mut expr = lower_expr(next_pair(&mut inner)?)?;
    while inner.next().is_some() {
        // skipped pair is the `|` token
        let rhs = lower_expr(next_pair(&mut inner)?)?;
        expr = Expr::Union {
            left: Box::new(expr),
            right: Box::new(rhs),
        };
    }
    Ok(expr)
}

fn lower_absolute_path(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let mut steps = Vec::new();
    let mut inner = pair.into_inner();
    let lead = next_pair(&mut inner)?;
    if lead.as_rule() == Rule::dbl_slash {
        steps.push(Step::descendant_or_self());
    }
    if let Some(rel) = inner.next() {
        lower_relative_into(rel, &mut steps)?;
    }
    Ok(Expr::Path(PathExpr {
        start: PathStart::Root,
        steps,
    }))
}

fn lower_filter_path(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let mut inner = pair.into_inner();
    let filter = lower_filter_expr(next_pair(&mut inner)?)?;
    match inner.next() {
        None => Ok(filter),
        Some(sep) => {
            let mut steps = Vec::new();
            if is_double_slash(sep)? {
                steps.push(Step::descendant_or_self());
            }
            lower_relative_into(next_pair(&mut inner)?, &mut steps)?;
            Ok(Expr::Path(PathExpr {
                start: PathStart::Filter(Box::new(filter)),
                steps,
            }))
        }
    }
}

fn lower_filter_expr(pair: Pair<'_, Rule>) -> Result<Expr, Error> {
    let mut inner = pair.into_inner();
    let primary = lower_expr(next_pair(&mut inner)?)?;
    let predicates = inner.map(lower_expr).collect::<Result<Vec<_>, _>>()?;
    if predicates.is_empty() {
        Ok(primary)
    } else {
        Ok(Expr::Filter {
            primary: Box::new(primary),
            predicates,
        })
    }
}

fn is_double_slash(sep: Pair<'_, Rule>) -> Result<bool, Error> {
    let mut inner = sep.into_inner();
    Ok(next_pair(&mut inner)?.as_rule() == Rule::dbl_slash)
}

fn lower_relative_into(pair: Pair<'_, Rule>, steps: &mut Vec<Step>) -> Result<(), Error> {
    let mut inner = pair.into_inner();
    steps.push(lower_step(next_pair(&mut inner)?)?);
    while let Some(sep) = inner.next() {
        if is_double_slash(sep)? {
            steps.push(Step::descendant_or_self());
        }
        steps.push(lower_step(next_pair(&mut inner)?)?);
    }
    Ok(())
}

fn lower_step(pair: Pair<'_, Rule>) -> Result<Step, Error> {
    let mut inner = pair.into_inner();
    let step = next_pair(&mut inner)?;
    match step.as_rule() {
        Rule::parent_step => Ok(Step {
            axis: Axis::Parent,
            test: NodeTest::Kind(KindTest::Node),
            predicates: Vec::new(),
        }),
        Rule::self_step => Ok(Step {
            axis: Axis::SelfAxis,
            test: NodeTest::Kind(KindTest::Node),
            predicates: Vec::new(),
        }),
        Rule::axis_step => lower_axis_step(step),
        rule => Err(Error::Syntax {
            expression: String::new(),
            message: format!("unexpected step rule {rule:?}"),
        }),
    }
}

fn lower_axis_step(pair: Pair<'_, Rule>) -> Result<Step, Error> {
    let mut axis = Axis::Child;
    let mut test = None;
    let mut predicates = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::attr_abbrev => axis = Axis::Attribute,
            Rule::axis_spec => {
                let mut inner = p.into_inner();
                axis = lower_axis_name(next_pair(&mut inner)?.as_str())?;
            }
            Rule::node_test => {
                let mut inner = p.into_inner();
                test = Some(lower_node_test(next_pair(&mut inner)?)?);
            }
            Rule::predicate => predicates.push(lower_expr(p)?),
            rule => {
                return Err(Error::Syntax {
                    expression: String::new(),
                    message: format!("unexpected rule {rule:?} in step"),
                });
            }
        }
    }
    let test = test.ok_or_else(|| Error::Syntax {
        expression: String::new(),
        message: "step without a node test".to_string(),
    })?;
    Ok(Step {
        axis,
        test,
        predicates,
    })
}

fn lower_axis_name(name: &str) -> Result<Axis, Error> {
    let axis = match name {
        "child" => Axis::Child,
        "descendant" => Axis::Descendant,
        "parent" => Axis::Parent,
        "ancestor" => Axis::Ancestor,
        "following-sibling" => Axis::FollowingSibling,
        "preceding-sibling" => Axis::PrecedingSibling,
        "following" => Axis::Following,
        "preceding" => Axis::Preceding,
        "attribute" => Axis::Attribute,
        "namespace" => Axis::Namespace,
        "self" => Axis::SelfAxis,
        "descendant-or-self" => Axis::DescendantOrSelf,
        "ancestor-or-self" => Axis::AncestorOrSelf,
        other => {
            return Err(Error::Syntax {
                expression: String::new(),
                message: format!("unknown axis {other}"),
            });
        }
    };
    Ok(axis)
}

fn lower_node_test(pair: Pair<'_, Rule>) -> Result<NodeTest, Error> {
    match pair.as_rule() {
        Rule::wildcard => Ok(NodeTest::Any),
        Rule::nc_wildcard => {
            let text = pair.as_str();
            let prefix = text.trim_end_matches(":*").to_string();
            Ok(NodeTest::NamespaceWildcard(prefix))
        }
        Rule::qname => Ok(NodeTest::Name(split_qname(pair.as_str()))),
        Rule::kind_test => {
            let mut inner = pair.into_inner();
            let kind = next_pair(&mut inner)?;
            match kind.as_rule() {
                Rule::node_kind_test => Ok(NodeTest::Kind(KindTest::Node)),
                Rule::text_test => Ok(NodeTest::Kind(KindTest::Text)),
                Rule::comment_test => Ok(NodeTest::Kind(KindTest::Comment)),
                Rule::pi_test => {
                    let target = kind
                        .into_inner()
                        .find(|p| p.as_rule() == Rule::string_literal)
                        .and_then(|lit| lit.into_inner().next().map(|s| s.as_str().to_string()));
                    Ok(NodeTest::Kind(KindTest::ProcessingInstruction(target)))
                }
                rule => Err(Error::Syntax {
                    expression: String::new(),
                    message: format!("unexpected kind test {rule:?}"),
                }),
            }
        }
        rule => Err(Error::Syntax {
            expression: String::new(),
            message: format!("unexpected node test {rule:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_number_and_string_literals() {
        assert_eq!(
            parse("3.5").unwrap(),
            Expr::Literal(Literal::Number(3.5))
        );
        assert_eq!(
            parse("'hi'").unwrap(),
            Expr::Literal(Literal::String("hi".to_string()))
        );
    }

    #[test]
    fn keyword_names_still_parse_as_steps() {
        // `div` alone is a name test, not an operator.
        let expr = parse("div").unwrap();
        match expr {
            Expr::Path(p) => {
                assert_eq!(p.start, PathStart::Relative);
                assert_eq!(p.steps.len(), 1);
                assert_eq!(
                    p.steps[0].test,
                    NodeTest::Name(ast::QName {
                        prefix: None,
                        local: "div".to_string()
                    })
                );
            }
            other => panic!("expected path, got {other:?}"),
        }
    }

    #[test]
    fn division_between_operands() {
        let expr = parse("4 div 2").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Div,
                ..
            }
        ));
    }

    #[test]
    fn abbreviated_descendant_injects_step() {
        let expr = parse("//item").unwrap();
        match expr {
            Expr::Path(p) => {
                assert_eq!(p.start, PathStart::Root);
                assert_eq!(p.steps.len(), 2);
                assert_eq!(p.steps[0], Step::descendant_or_self());
            }
            other => panic!("expected path, got {other:?}"),
        }
    }

    #[test]
    fn filter_expression_with_trailing_path() {
        let expr = parse("instance('cities')/city").unwrap();
        match expr {
            Expr::Path(p) => {
                assert!(matches!(p.start, PathStart::Filter(_)));
                assert_eq!(p.steps.len(), 1);
            }
            other => panic!("expected path, got {other:?}"),
        }
    }

    #[test]
    fn axis_and_kind_tests() {
        let expr = parse("ancestor-or-self::node()/child::text()").unwrap();
        match expr {
            Expr::Path(p) => {
                assert_eq!(p.steps[0].axis, Axis::AncestorOrSelf);
                assert_eq!(p.steps[1].test, NodeTest::Kind(KindTest::Text));
            }
            other => panic!("expected path, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse("").is_err());
        assert!(parse("1 +").is_err());
        assert!(parse("foo(").is_err());
    }
}
