//! Functions in the XForms namespace.

use std::rc::Rc;

use itertools::Itertools;

use formpath_xpath::consts::XFORMS_NS;
use formpath_xpath::library::FunctionLibrary;
use formpath_xpath::model::NodeAdapter;
use formpath_xpath::value::Value;

use crate::state::XFormsState;

/// The XForms library: secondary-instance access, the original context node,
/// select-list helpers and string conveniences.
pub fn xforms_function_library<A: NodeAdapter>(
    state: Rc<XFormsState<A::Node>>,
) -> FunctionLibrary<A> {
    let mut lib: FunctionLibrary<A> = FunctionLibrary::new(XFORMS_NS);

    {
        let state = Rc::clone(&state);
        lib.register("instance", 1, Some(1), move |ctx, args| {
            let id = args[0].string(ctx.adapter());
            // An unregistered id selects nothing rather than failing, so
            // expressions can probe for optional instances.
            Ok(Value::NodeSet(state.instance(&id).into_iter().collect()))
        });
    }

    lib.register("current", 0, Some(0), |ctx, _| {
        Ok(Value::NodeSet(vec![ctx.evaluation_context_node().clone()]))
    });

    lib.register("boolean-from-string", 1, Some(1), |ctx, args| {
        let s = args[0].string(ctx.adapter());
        Ok(Value::Boolean(s == "true" || s == "1"))
    });

    lib.register("if", 3, Some(3), |_, args| {
        Ok(if args[0].boolean() {
            args[1].clone()
        } else {
            args[2].clone()
        })
    });

    lib.register("coalesce", 2, Some(2), |ctx, args| {
        let first = args[0].string(ctx.adapter());
        Ok(Value::String(if first.is_empty() {
            args[1].string(ctx.adapter())
        } else {
            first
        }))
    });

    lib.register_variadic("join", 1, |ctx, args| {
        let separator = args[0].string(ctx.adapter());
        let mut pieces = Vec::new();
        for arg in &args[1..] {
            match arg {
                Value::NodeSet(nodes) => {
                    pieces.extend(nodes.iter().map(|n| ctx.adapter().string_value(n)));
                }
                other => pieces.push(other.string(ctx.adapter())),
            }
        }
        Ok(Value::String(pieces.iter().join(&separator)))
    });

    lib.register("selected", 2, Some(2), |ctx, args| {
        let list = args[0].string(ctx.adapter());
        let value = args[1].string(ctx.adapter());
        let value = value.trim();
        Ok(Value::Boolean(
            list.split_ascii_whitespace().any(|token| token == value),
        ))
    });

    lib.register("selected-at", 2, Some(2), |ctx, args| {
        let list = args[0].string(ctx.adapter());
        let index = args[1].number(ctx.adapter());
        // Zero-based; fractional indexes truncate, anything out of range
        // selects the empty string.
        let token = if index.is_nan() || index < 0.0 {
            None
        } else {
            list.split_ascii_whitespace().nth(index.trunc() as usize)
        };
        Ok(Value::String(token.unwrap_or_default().to_string()))
    });

    lib.register("count-selected", 1, Some(1), |ctx, args| {
        let list = args[0].string(ctx.adapter());
        Ok(Value::Number(list.split_ascii_whitespace().count() as f64))
    });

    lib.register("count-non-empty", 1, Some(1), |ctx, args| {
        let nodes = args[0].clone().into_node_set("count-non-empty()")?;
        let count = nodes
            .iter()
            .filter(|n| !ctx.adapter().string_value(n).is_empty())
            .count();
        Ok(Value::Number(count as f64))
    });

    lib
}
