//! Domain function libraries, one per namespace.

mod javarosa;
mod odk;
mod xforms;

pub use javarosa::javarosa_function_library;
pub use odk::odk_function_library;
pub use xforms::xforms_function_library;
