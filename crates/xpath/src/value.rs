//! The four XPath 1.0 value types and their coercion rules, plus the
//! DOM-Level-3-XPath-shaped result surface.

use crate::error::Error;
use crate::model::{NodeAdapter, NodeKind};

/// A raw evaluation result before coercion to the requested result type.
///
/// Node-sets produced by the engine are deduplicated and in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<N> {
    Boolean(bool),
    Number(f64),
    String(String),
    NodeSet(Vec<N>),
}

impl<N: Clone> Value<N> {
    /// XPath 1.0 `boolean()` coercion.
    pub fn boolean(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::NodeSet(nodes) => !nodes.is_empty(),
        }
    }

    /// XPath 1.0 `string()` coercion. A node-set converts to the
    /// string-value of its first node in document order, or `""` if empty.
    pub fn string<A: NodeAdapter<Node = N>>(&self, adapter: &A) -> String {
        match self {
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::NodeSet(nodes) => nodes
                .first()
                .map(|n| adapter.string_value(n))
                .unwrap_or_default(),
        }
    }

    /// XPath 1.0 `number()` coercion (an empty node-set is `NaN`).
    pub fn number<A: NodeAdapter<Node = N>>(&self, adapter: &A) -> f64 {
        match self {
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => number_from_str(s),
            Value::NodeSet(_) => number_from_str(&self.string(adapter)),
        }
    }

    pub fn is_node_set(&self) -> bool {
        matches!(self, Value::NodeSet(_))
    }

    /// Node-set contents, or an evaluation error carrying `what` when the
    /// value is of another type.
    pub fn into_node_set(self, what: &str) -> Result<Vec<N>, Error> {
        match self {
            Value::NodeSet(nodes) => Ok(nodes),
            _ => Err(Error::evaluation(format!("{what} requires a node-set"))),
        }
    }
}

/// Strict XPath 1.0 number lexical form: optional minus, digits, optional
/// fraction. No exponent, no leading `+`. Anything else is `NaN`.
pub fn number_from_str(s: &str) -> f64 {
    let t = s.trim_matches([' ', '\t', '\r', '\n']);
    if t.is_empty() {
        return f64::NAN;
    }
    let body = t.strip_prefix('-').unwrap_or(t);
    let mut parts = body.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next();
    let digits_ok = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    let valid = match frac_part {
        // "12", with at least one digit
        None => !int_part.is_empty() && digits_ok(int_part),
        // "12.", "12.5", ".5" — at least one digit somewhere
        Some(frac) => {
            digits_ok(int_part)
                && digits_ok(frac)
                && !(int_part.is_empty() && frac.is_empty())
        }
    };
    if !valid {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

/// XPath 1.0 number-to-string conversion: `NaN`, signed `Infinity`, integers
/// without a decimal point (negative zero prints as `0`), shortest decimal
/// form otherwise.
pub fn format_number(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if v == v.trunc() && v.abs() < 9.007_199_254_740_992e15 {
        return format!("{}", v as i64);
    }
    format!("{v}")
}

/// XPath 1.0 `round()`: half rounds toward positive infinity.
pub fn xpath_round(v: f64) -> f64 {
    if v.is_nan() || v.is_infinite() {
        return v;
    }
    (v + 0.5).floor()
}

/// Requested result type, mirroring the DOM Level 3 XPath categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    /// Whatever type the expression naturally produces.
    Any,
    Number,
    String,
    Boolean,
    /// First node of the result set in document order.
    FirstOrderedNode,
    /// The full result set, in document order.
    OrderedNodeSnapshot,
}

/// A typed, coerced evaluation result.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathResult<N> {
    Boolean(bool),
    Number(f64),
    String(String),
    Nodes(Vec<N>),
    FirstNode(Option<N>),
}

impl<N: Clone> XPathResult<N> {
    /// Coerce a raw value to the requested result type.
    pub(crate) fn coerce<A: NodeAdapter<Node = N>>(
        value: Value<N>,
        result_type: ResultType,
        adapter: &A,
    ) -> Result<Self, Error> {
        match result_type {
            ResultType::Boolean => Ok(XPathResult::Boolean(value.boolean())),
            ResultType::Number => Ok(XPathResult::Number(value.number(adapter))),
            ResultType::String => Ok(XPathResult::String(value.string(adapter))),
            ResultType::FirstOrderedNode => {
                let nodes = value.into_node_set("a node result")?;
                Ok(XPathResult::FirstNode(nodes.into_iter().next()))
            }
            ResultType::OrderedNodeSnapshot => {
                Ok(XPathResult::Nodes(value.into_node_set("a node result")?))
            }
            ResultType::Any => Ok(match value {
                Value::Boolean(b) => XPathResult::Boolean(b),
                Value::Number(n) => XPathResult::Number(n),
                Value::String(s) => XPathResult::String(s),
                Value::NodeSet(nodes) => XPathResult::Nodes(nodes),
            }),
        }
    }

    pub fn boolean(&self) -> Option<bool> {
        match self {
            XPathResult::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn number(&self) -> Option<f64> {
        match self {
            XPathResult::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn string(&self) -> Option<&str> {
        match self {
            XPathResult::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn nodes(&self) -> Option<&[N]> {
        match self {
            XPathResult::Nodes(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn first_node(&self) -> Option<&N> {
        match self {
            XPathResult::FirstNode(node) => node.as_ref(),
            XPathResult::Nodes(nodes) => nodes.first(),
            _ => None,
        }
    }
}

/// Filter to element nodes only; used by the element-typed accessors.
pub(crate) fn first_element<A: NodeAdapter>(adapter: &A, nodes: &[A::Node]) -> Option<A::Node> {
    nodes
        .iter()
        .find(|n| adapter.node_kind(n) == NodeKind::Element)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_lexical_forms() {
        assert_eq!(number_from_str(" 12 "), 12.0);
        assert_eq!(number_from_str("-3.5"), -3.5);
        assert_eq!(number_from_str(".5"), 0.5);
        assert_eq!(number_from_str("12."), 12.0);
        assert!(number_from_str("1e3").is_nan());
        assert!(number_from_str("+1").is_nan());
        assert!(number_from_str("").is_nan());
        assert!(number_from_str("1 2").is_nan());
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
    }

    #[test]
    fn round_half_toward_positive_infinity() {
        assert_eq!(xpath_round(2.5), 3.0);
        assert_eq!(xpath_round(-2.5), -2.0);
        assert!(xpath_round(f64::NAN).is_nan());
    }
}
