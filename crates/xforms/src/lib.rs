pub mod evaluator;
pub mod functions;
pub mod state;

pub use evaluator::{XFormsEvaluator, XFormsEvaluatorBuilder};
pub use functions::{
    javarosa_function_library, odk_function_library, xforms_function_library,
};
pub use state::XFormsState;
