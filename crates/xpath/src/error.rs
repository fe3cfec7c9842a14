//! Error taxonomy.
//!
//! Configuration and resolution problems are reported to the caller through
//! these variants. Adapter contract violations (handing the evaluator a value
//! that is not an XPath node) are programmer errors and assert instead of
//! returning an `Error`.

/// Errors reported by evaluator construction and `evaluate*` calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The expression text did not parse as XPath 1.0.
    #[error("syntax error in expression `{expression}`: {message}")]
    Syntax { expression: String, message: String },

    /// A configured root node is not capable of holding children.
    #[error("invalid root node: {0}")]
    InvalidRootNode(String),

    /// Two function libraries were registered under one namespace URI.
    #[error("duplicate function library for namespace {0}")]
    DuplicateFunctionLibrary(String),

    /// A default function namespace has no registered library backing it.
    #[error("no function library registered for default namespace {0}")]
    MissingDefaultLibrary(String),

    /// An explicitly namespaced function call named a namespace with no
    /// registered library.
    #[error("no function library registered for namespace {namespace}")]
    UnknownFunctionLibrary { namespace: String },

    /// No library in scope provides the named function.
    #[error("unknown function {name}")]
    UnknownFunction { name: String },

    /// The function exists but was called with an unsupported argument count.
    #[error("function {name} expects {expected} arguments, got {actual}")]
    FunctionArity {
        name: String,
        expected: String,
        actual: usize,
    },

    /// Neither the call site nor the evaluator supplied a context node.
    #[error("no context node available for evaluation")]
    MissingContextNode,

    /// An assert-exists style accessor matched nothing.
    #[error("expression `{expression}` did not match any node")]
    NodeRequired { expression: String },

    /// Variable references parse but this evaluator binds no variables.
    #[error("unknown variable ${name}")]
    UnknownVariable { name: String },

    /// A dynamic evaluation failure (type mismatch, undefined prefix, or a
    /// domain function reporting its own error).
    #[error("{0}")]
    Evaluation(String),
}

impl Error {
    pub(crate) fn evaluation(msg: impl Into<String>) -> Self {
        Error::Evaluation(msg.into())
    }
}
