//! The XPath 1.0 core function library (`fn` namespace).

use std::collections::HashSet;

use crate::consts::{FN_NS, XML_NS};
use crate::context::EvaluationContext;
use crate::error::Error;
use crate::library::FunctionLibrary;
use crate::model::{NodeAdapter, NodeKind};
use crate::value::{Value, number_from_str, xpath_round};

/// Build the standard library. Registered under the XPath functions
/// namespace; evaluators place it last in the default chain so domain
/// libraries can shadow individual names without hiding the rest.
pub fn core_function_library<A: NodeAdapter>() -> FunctionLibrary<A> {
    let mut lib: FunctionLibrary<A> = FunctionLibrary::new(FN_NS);

    // Node-set functions
    lib.register("last", 0, Some(0), |ctx, _| {
        Ok(Value::Number(ctx.size() as f64))
    });
    lib.register("position", 0, Some(0), |ctx, _| {
        Ok(Value::Number(ctx.position() as f64))
    });
    lib.register("count", 1, Some(1), |_, args| {
        let nodes = args[0].clone().into_node_set("count()")?;
        Ok(Value::Number(nodes.len() as f64))
    });
    lib.register("id", 1, Some(1), |ctx, args| {
        let tokens: HashSet<String> = match &args[0] {
            Value::NodeSet(nodes) => nodes
                .iter()
                .flat_map(|n| {
                    ctx.adapter()
                        .string_value(n)
                        .split_ascii_whitespace()
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .collect(),
            other => other
                .string(ctx.adapter())
                .split_ascii_whitespace()
                .map(str::to_string)
                .collect(),
        };
        Ok(Value::NodeSet(elements_by_id(ctx, &tokens)))
    });
    lib.register("local-name", 0, Some(1), |ctx, args| {
        Ok(Value::String(
            named_node(ctx, args)?
                .and_then(|n| ctx.adapter().node_name(&n))
                .map(|n| n.local)
                .unwrap_or_default(),
        ))
    });
    lib.register("namespace-uri", 0, Some(1), |ctx, args| {
        Ok(Value::String(
            named_node(ctx, args)?
                .and_then(|n| ctx.adapter().namespace_uri(&n))
                .unwrap_or_default(),
        ))
    });
    lib.register("name", 0, Some(1), |ctx, args| {
        Ok(Value::String(
            named_node(ctx, args)?
                .and_then(|n| ctx.adapter().node_name(&n))
                .map(|n| n.lexical())
                .unwrap_or_default(),
        ))
    });

    // String functions
    lib.register("string", 0, Some(1), |ctx, args| {
        Ok(Value::String(string_arg_or_context(ctx, args, 0)))
    });
    lib.register_variadic("concat", 2, |ctx, args| {
        let mut out = String::new();
        for arg in args {
            out.push_str(&arg.string(ctx.adapter()));
        }
        Ok(Value::String(out))
    });
    lib.register("starts-with", 2, Some(2), |ctx, args| {
        let s = args[0].string(ctx.adapter());
        let prefix = args[1].string(ctx.adapter());
        Ok(Value::Boolean(s.starts_with(&prefix)))
    });
    lib.register("contains", 2, Some(2), |ctx, args| {
        let s = args[0].string(ctx.adapter());
        let needle = args[1].string(ctx.adapter());
        Ok(Value::Boolean(s.contains(&needle)))
    });
    lib.register("substring-before", 2, Some(2), |ctx, args| {
        let s = args[0].string(ctx.adapter());
        let sep = args[1].string(ctx.adapter());
        Ok(Value::String(
            s.find(&sep).map(|i| s[..i].to_string()).unwrap_or_default(),
        ))
    });
    lib.register("substring-after", 2, Some(2), |ctx, args| {
        let s = args[0].string(ctx.adapter());
        let sep = args[1].string(ctx.adapter());
        Ok(Value::String(
            s.find(&sep)
                .map(|i| s[i + sep.len()..].to_string())
                .unwrap_or_default(),
        ))
    });
    lib.register("substring", 2, Some(3), |ctx, args| {
        let s = args[0].string(ctx.adapter());
        let start = xpath_round(args[1].number(ctx.adapter()));
        let end = args
            .get(2)
            .map(|len| start + xpath_round(len.number(ctx.adapter())));
        // Positions are 1-based; a NaN bound selects nothing.
        let out: String = s
            .chars()
            .enumerate()
            .filter(|(i, _)| {
                let p = (*i + 1) as f64;
                p >= start && end.is_none_or(|end| p < end)
            })
            .map(|(_, c)| c)
            .collect();
        Ok(Value::String(out))
    });
    lib.register("string-length", 0, Some(1), |ctx, args| {
        Ok(Value::Number(
            string_arg_or_context(ctx, args, 0).chars().count() as f64,
        ))
    });
    lib.register("normalize-space", 0, Some(1), |ctx, args| {
        let s = string_arg_or_context(ctx, args, 0);
        let normalized = s
            .split([' ', '\t', '\r', '\n'])
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(Value::String(normalized))
    });
    lib.register("translate", 3, Some(3), |ctx, args| {
        let s = args[0].string(ctx.adapter());
        let from: Vec<char> = args[1].string(ctx.adapter()).chars().collect();
        let to: Vec<char> = args[2].string(ctx.adapter()).chars().collect();
        let out: String = s
            .chars()
            .filter_map(|c| match from.iter().position(|f| *f == c) {
                // First occurrence in `from` wins; beyond `to` means removal.
                Some(i) => to.get(i).copied(),
                None => Some(c),
            })
            .collect();
        Ok(Value::String(out))
    });

    // Boolean functions
    lib.register("boolean", 1, Some(1), |_, args| {
        Ok(Value::Boolean(args[0].boolean()))
    });
    lib.register("not", 1, Some(1), |_, args| {
        Ok(Value::Boolean(!args[0].boolean()))
    });
    lib.register("true", 0, Some(0), |_, _| Ok(Value::Boolean(true)));
    lib.register("false", 0, Some(0), |_, _| Ok(Value::Boolean(false)));
    lib.register("lang", 1, Some(1), |ctx, args| {
        let wanted = args[0].string(ctx.adapter()).to_ascii_lowercase();
        Ok(Value::Boolean(context_language(ctx).is_some_and(|l| {
            let lang = l.to_ascii_lowercase();
            lang == wanted
                || (lang.starts_with(&wanted)
                    && lang[wanted.len()..].starts_with('-'))
        })))
    });

    // Number functions
    lib.register("number", 0, Some(1), |ctx, args| {
        Ok(Value::Number(match args.first() {
            Some(v) => v.number(ctx.adapter()),
            None => number_from_str(&ctx.adapter().string_value(ctx.context_node())),
        }))
    });
    lib.register("sum", 1, Some(1), |ctx, args| {
        let nodes = args[0].clone().into_node_set("sum()")?;
        let total = nodes
            .iter()
            .map(|n| number_from_str(&ctx.adapter().string_value(n)))
            .sum();
        Ok(Value::Number(total))
    });
    lib.register("floor", 1, Some(1), |ctx, args| {
        Ok(Value::Number(args[0].number(ctx.adapter()).floor()))
    });
    lib.register("ceiling", 1, Some(1), |ctx, args| {
        Ok(Value::Number(args[0].number(ctx.adapter()).ceil()))
    });
    lib.register("round", 1, Some(1), |ctx, args| {
        Ok(Value::Number(xpath_round(args[0].number(ctx.adapter()))))
    });

    lib
}

/// Argument string, or the context node's string-value when absent.
fn string_arg_or_context<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    args: &[Value<A::Node>],
    index: usize,
) -> String {
    match args.get(index) {
        Some(v) => v.string(ctx.adapter()),
        None => ctx.adapter().string_value(ctx.context_node()),
    }
}

/// The node a name-reading function operates on: the first node of the
/// argument node-set, or the context node when no argument is given.
fn named_node<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    args: &[Value<A::Node>],
) -> Result<Option<A::Node>, Error> {
    match args.first() {
        None => Ok(Some(ctx.context_node().clone())),
        Some(v) => Ok(v.clone().into_node_set("a name function")?.into_iter().next()),
    }
}

/// Elements in the containing document carrying a matching no-namespace
/// `id` attribute, in document order.
fn elements_by_id<A: NodeAdapter>(
    ctx: &EvaluationContext<'_, A>,
    tokens: &HashSet<String>,
) -> Vec<A::Node> {
    let adapter = ctx.adapter();
    let mut out = Vec::new();
    let mut stack = adapter.children(ctx.containing_document());
    stack.reverse();
    while let Some(node) = stack.pop() {
        if adapter.node_kind(&node) == NodeKind::Element
            && adapter
                .local_named_attribute_value(&node, "id")
                .is_some_and(|v| tokens.contains(&v))
        {
            out.push(node.clone());
        }
        let mut children = adapter.children(&node);
        children.reverse();
        stack.extend(children);
    }
    out
}

/// Nearest `xml:lang` attribute value on the ancestor-or-self chain.
fn context_language<A: NodeAdapter>(ctx: &EvaluationContext<'_, A>) -> Option<String> {
    let adapter = ctx.adapter();
    let mut cursor = Some(ctx.context_node().clone());
    while let Some(node) = cursor {
        if adapter.node_kind(&node) == NodeKind::Element {
            let lang = adapter.attributes(&node).into_iter().find_map(|a| {
                let name = adapter.node_name(&a)?;
                (name.local == "lang"
                    && adapter.namespace_uri(&a).as_deref() == Some(XML_NS))
                .then(|| adapter.string_value(&a))
            });
            if lang.is_some() {
                return lang;
            }
        }
        cursor = adapter.parent(&node);
    }
    None
}
