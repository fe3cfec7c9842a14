//! Well-known namespace URIs.

/// XPath 1.0 core function namespace.
pub const FN_NS: &str = "http://www.w3.org/2005/xpath-functions";
/// Reserved `xml` prefix namespace (non-overridable).
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
/// Namespace-declaration namespace; names in it classify as namespace nodes.
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";
/// XForms namespace.
pub const XFORMS_NS: &str = "http://www.w3.org/2002/xforms";
/// XHTML namespace.
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
/// JavaRosa namespace (`jr:` prefix, itext translations).
pub const JAVAROSA_NS: &str = "http://openrosa.org/javarosa";
/// OpenRosa XForms extensions namespace.
pub const OPENROSA_XFORMS_NS: &str = "http://openrosa.org/xforms";
/// ODK convenience function namespace.
pub const ODK_NS: &str = "http://www.opendatakit.org/xforms";

/// Built-in prefix table consulted after the external resolver and the
/// adapter's own namespace lookup have both come up empty.
pub const STATIC_PREFIXES: &[(&str, &str)] = &[
    ("xml", XML_NS),
    ("xmlns", XMLNS_NS),
    ("fn", FN_NS),
    ("xf", XFORMS_NS),
    ("h", XHTML_NS),
    ("jr", JAVAROSA_NS),
    ("orx", OPENROSA_XFORMS_NS),
    ("odk", ODK_NS),
];
