//! Functions in the JavaRosa namespace.

use std::rc::Rc;

use formpath_xpath::consts::JAVAROSA_NS;
use formpath_xpath::library::FunctionLibrary;
use formpath_xpath::model::NodeAdapter;
use formpath_xpath::value::Value;

use crate::state::XFormsState;

/// The JavaRosa library. Holds `itext()`, which reads the active-language
/// translation table. Registered under its own namespace only, so calls are
/// always prefixed (`jr:itext`).
pub fn javarosa_function_library<A: NodeAdapter>(
    state: Rc<XFormsState<A::Node>>,
) -> FunctionLibrary<A> {
    let mut lib: FunctionLibrary<A> = FunctionLibrary::new(JAVAROSA_NS);

    lib.register("itext", 1, Some(1), move |ctx, args| {
        let id = args[0].string(ctx.adapter());
        Ok(Value::String(state.itext(&id)?))
    });

    lib
}
