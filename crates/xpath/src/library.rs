//! Namespace-keyed function libraries and their dispatch rules.
//!
//! A collection maps (namespace, local name) to an implementation. An ordered
//! list of default namespaces serves unprefixed calls: a library earlier in
//! the list shadows a same-named function in a later one without deleting it,
//! so both stay reachable under their own namespace.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::context::EvaluationContext;
use crate::error::Error;
use crate::model::NodeAdapter;
use crate::value::Value;

/// A callable function implementation. Receives the evaluation context and
/// the already-evaluated argument values.
pub type FunctionImpl<A> = Rc<
    dyn Fn(
        &EvaluationContext<'_, A>,
        &[Value<<A as NodeAdapter>::Node>],
    ) -> Result<Value<<A as NodeAdapter>::Node>, Error>,
>;

/// Implementation plus accepted argument count range.
pub struct FunctionEntry<A: NodeAdapter> {
    min_args: usize,
    max_args: Option<usize>,
    implementation: FunctionImpl<A>,
}

impl<A: NodeAdapter> FunctionEntry<A> {
    /// Invoke after validating the argument count against the entry's range.
    pub fn call(
        &self,
        ctx: &EvaluationContext<'_, A>,
        name: &str,
        args: &[Value<A::Node>],
    ) -> Result<Value<A::Node>, Error> {
        let ok = args.len() >= self.min_args
            && self.max_args.is_none_or(|max| args.len() <= max);
        if !ok {
            let expected = match self.max_args {
                Some(max) if max == self.min_args => format!("{max}"),
                Some(max) => format!("{}..{max}", self.min_args),
                None => format!("at least {}", self.min_args),
            };
            return Err(Error::FunctionArity {
                name: name.to_string(),
                expected,
                actual: args.len(),
            });
        }
        (self.implementation)(ctx, args)
    }
}

/// A namespace URI plus its named callable implementations.
pub struct FunctionLibrary<A: NodeAdapter> {
    namespace_uri: String,
    functions: HashMap<String, FunctionEntry<A>>,
}

impl<A: NodeAdapter> FunctionLibrary<A> {
    pub fn new(namespace_uri: impl Into<String>) -> Self {
        FunctionLibrary {
            namespace_uri: namespace_uri.into(),
            functions: HashMap::new(),
        }
    }

    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    /// Register a function with a fixed or bounded argument count.
    pub fn register<F>(&mut self, local: &str, min_args: usize, max_args: Option<usize>, f: F)
    where
        F: Fn(
                &EvaluationContext<'_, A>,
                &[Value<A::Node>],
            ) -> Result<Value<A::Node>, Error>
            + 'static,
    {
        self.functions.insert(
            local.to_string(),
            FunctionEntry {
                min_args,
                max_args,
                implementation: Rc::new(f),
            },
        );
    }

    /// Register a variadic function accepting `min_args` or more arguments.
    pub fn register_variadic<F>(&mut self, local: &str, min_args: usize, f: F)
    where
        F: Fn(
                &EvaluationContext<'_, A>,
                &[Value<A::Node>],
            ) -> Result<Value<A::Node>, Error>
            + 'static,
    {
        self.register(local, min_args, None, f);
    }

    pub fn get(&self, local: &str) -> Option<&FunctionEntry<A>> {
        self.functions.get(local)
    }

    pub fn contains(&self, local: &str) -> bool {
        self.functions.contains_key(local)
    }
}

/// Namespace-keyed registry of libraries with an ordered default list for
/// unprefixed calls.
pub struct FunctionLibraryCollection<A: NodeAdapter> {
    libraries: HashMap<String, FunctionLibrary<A>>,
    default_namespaces: Vec<String>,
}

impl<A: NodeAdapter> FunctionLibraryCollection<A> {
    /// Build a collection. Registering two libraries under one namespace URI
    /// is a setup-time error, as is naming a default namespace with no
    /// library behind it.
    pub fn new(
        libraries: Vec<FunctionLibrary<A>>,
        default_namespaces: Vec<String>,
    ) -> Result<Self, Error> {
        let mut by_ns: HashMap<String, FunctionLibrary<A>> = HashMap::new();
        for lib in libraries {
            let ns = lib.namespace_uri().to_string();
            debug!(namespace = %ns, "registering function library");
            if by_ns.insert(ns.clone(), lib).is_some() {
                return Err(Error::DuplicateFunctionLibrary(ns));
            }
        }
        for ns in &default_namespaces {
            if !by_ns.contains_key(ns) {
                return Err(Error::MissingDefaultLibrary(ns.clone()));
            }
        }
        Ok(FunctionLibraryCollection {
            libraries: by_ns,
            default_namespaces,
        })
    }

    /// A collection holding exactly one library, which also serves as the
    /// sole default namespace. Cannot fail, unlike [`Self::new`].
    pub(crate) fn single_default(lib: FunctionLibrary<A>) -> Self {
        let ns = lib.namespace_uri().to_string();
        let mut libraries = HashMap::new();
        libraries.insert(ns.clone(), lib);
        FunctionLibraryCollection {
            libraries,
            default_namespaces: vec![ns],
        }
    }

    pub fn library(&self, namespace_uri: &str) -> Option<&FunctionLibrary<A>> {
        self.libraries.get(namespace_uri)
    }

    /// First implementation for `local` along the default-namespace chain.
    /// Establishes the override priority for unprefixed calls.
    pub fn default_implementation(&self, local: &str) -> Option<&FunctionEntry<A>> {
        self.default_namespaces
            .iter()
            .filter_map(|ns| self.libraries.get(ns))
            .find_map(|lib| lib.get(local))
    }

    /// Look up a function in an explicitly named namespace. A resolvable
    /// namespace with no registered library is a caller error, distinct from
    /// an unprefixed call falling through the default chain.
    pub fn implementation_in_namespace(
        &self,
        namespace_uri: &str,
        local: &str,
    ) -> Result<&FunctionEntry<A>, Error> {
        let lib = self
            .libraries
            .get(namespace_uri)
            .ok_or_else(|| Error::UnknownFunctionLibrary {
                namespace: namespace_uri.to_string(),
            })?;
        lib.get(local).ok_or_else(|| Error::UnknownFunction {
            name: format!("{{{namespace_uri}}}{local}"),
        })
    }

    /// Resolve a call as written: a prefixed name goes through the context's
    /// namespace resolver, an unresolvable prefix falls back to the default
    /// chain, an unprefixed name walks the default chain directly.
    pub fn implementation_for_call(
        &self,
        ctx: &EvaluationContext<'_, A>,
        prefix: Option<&str>,
        local: &str,
    ) -> Result<&FunctionEntry<A>, Error> {
        if let Some(p) = prefix
            && let Some(uri) = ctx.resolver().resolve(ctx.adapter(), Some(p))
        {
            return self.implementation_in_namespace(&uri, local);
        }
        self.default_implementation(local)
            .ok_or_else(|| Error::UnknownFunction {
                name: match prefix {
                    Some(p) => format!("{p}:{local}"),
                    None => local.to_string(),
                },
            })
    }
}
