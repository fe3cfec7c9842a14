//! Prefix-to-namespace resolution.
//!
//! One resolver is bound to a tree scope for its whole lifetime. Lookups are
//! memoized per prefix and never invalidated; the evaluator reuses resolver
//! instances for equivalent (root node, external resolver) bindings so the
//! cache stays warm across evaluations.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::trace;

use crate::consts::{STATIC_PREFIXES, XML_NS};
use crate::model::NodeAdapter;

/// Caller-supplied prefix lookup: a closure or any object with a "lookup by
/// prefix" capability. `None` asks for the default namespace.
pub trait PrefixResolver {
    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<String>;
}

impl<F> PrefixResolver for F
where
    F: Fn(Option<&str>) -> Option<String>,
{
    fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<String> {
        self(prefix)
    }
}

/// Resolves a syntactic prefix (or `None` for the default namespace) to a
/// URI, consistently for one tree scope.
///
/// Resolution order, first match wins: the external resolver, the adapter's
/// own scope-sensitive lookup rooted at the bound node, the static built-in
/// prefix table. The reserved `xml` prefix always resolves to its standard
/// URI and cannot be overridden.
pub struct NamespaceResolver<N> {
    root: N,
    external: Option<Rc<dyn PrefixResolver>>,
    cache: RefCell<HashMap<Option<String>, Option<String>>>,
}

impl<N: Clone + Eq> NamespaceResolver<N> {
    pub fn new(root: N, external: Option<Rc<dyn PrefixResolver>>) -> Self {
        NamespaceResolver {
            root,
            external,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Whether this resolver is already bound to the given scope, by node
    /// identity and external-resolver identity.
    pub(crate) fn is_bound_to(&self, root: &N, external: Option<&Rc<dyn PrefixResolver>>) -> bool {
        if &self.root != root {
            return false;
        }
        match (&self.external, external) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Resolve a prefix, memoizing the answer for the resolver's lifetime.
    /// A `None` prefix resolves the document's default namespace rather than
    /// failing.
    pub fn resolve<A>(&self, adapter: &A, prefix: Option<&str>) -> Option<String>
    where
        A: NodeAdapter<Node = N>,
    {
        if let Some(cached) = self.cache.borrow().get(&prefix.map(str::to_string)) {
            return cached.clone();
        }
        trace!(?prefix, "namespace resolver cache miss");
        let resolved = self.resolve_uncached(adapter, prefix);
        self.cache
            .borrow_mut()
            .insert(prefix.map(str::to_string), resolved.clone());
        resolved
    }

    fn resolve_uncached<A>(&self, adapter: &A, prefix: Option<&str>) -> Option<String>
    where
        A: NodeAdapter<Node = N>,
    {
        if prefix == Some("xml") {
            return Some(XML_NS.to_string());
        }
        if let Some(external) = &self.external
            && let Some(uri) = external.lookup_namespace_uri(prefix)
        {
            return Some(uri);
        }
        if let Some(uri) = adapter.lookup_namespace_uri(&self.root, prefix) {
            return Some(uri);
        }
        prefix.and_then(static_lookup)
    }
}

fn static_lookup(prefix: &str) -> Option<String> {
    STATIC_PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, uri)| (*uri).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{FN_NS, JAVAROSA_NS};

    #[test]
    fn static_table_covers_known_prefixes() {
        assert_eq!(static_lookup("fn").as_deref(), Some(FN_NS));
        assert_eq!(static_lookup("jr").as_deref(), Some(JAVAROSA_NS));
        assert_eq!(static_lookup("nope"), None);
    }
}
