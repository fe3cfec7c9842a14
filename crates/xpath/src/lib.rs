pub mod consts;
pub mod context;
mod engine;
pub mod error;
pub mod evaluator;
mod functions;
pub mod library;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod simple_node;
pub mod value;

pub use consts::{FN_NS, JAVAROSA_NS, ODK_NS, OPENROSA_XFORMS_NS, XFORMS_NS, XML_NS};
pub use context::EvaluationContext;
pub use error::Error;
pub use evaluator::{Evaluator, EvaluatorBuilder};
pub use functions::core_function_library;
pub use library::{FunctionLibrary, FunctionLibraryCollection};
pub use model::{NodeAdapter, NodeKind, QName, compare_by_ancestry};
pub use resolver::{NamespaceResolver, PrefixResolver};
pub use simple_node::{SimpleNode, SimpleNodeAdapter};
pub use value::{ResultType, Value, XPathResult};
