use hyper::Method;
use std::fmt;

/// The method a route or middleware entry is registered under.
///
/// [`RouteMethod::Any`] admits every request method. Routes registered under it
/// live in their own trie and are only consulted when the exact-method trie of
/// the same group has no match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Exact(Method),
    Any,
}

impl RouteMethod {
    /// Returns true if a request with `method` may be served.
    pub fn admits(&self, method: &Method) -> bool {
        match self {
            RouteMethod::Exact(m) => m == method,
            RouteMethod::Any => true,
        }
    }
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        RouteMethod::Exact(method)
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMethod::Exact(method) => f.write_str(method.as_str()),
            RouteMethod::Any => f.write_str("ANY"),
        }
    }
}

/// One or more paths accepted by the registration methods.
///
/// Implemented for a single path as well as for collections, so both
/// `get("/", ..)` and `get(["/", "/index"], ..)` work.
pub trait IntoPaths {
    fn into_paths(self) -> Vec<String>;
}

impl IntoPaths for &str {
    fn into_paths(self) -> Vec<String> {
        vec![self.to_owned()]
    }
}

impl IntoPaths for String {
    fn into_paths(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoPaths for &[&str] {
    fn into_paths(self) -> Vec<String> {
        self.iter().map(|path| (*path).to_owned()).collect()
    }
}

impl<const N: usize> IntoPaths for [&str; N] {
    fn into_paths(self) -> Vec<String> {
        self.iter().map(|path| (*path).to_owned()).collect()
    }
}

impl IntoPaths for Vec<&str> {
    fn into_paths(self) -> Vec<String> {
        self.into_iter().map(str::to_owned).collect()
    }
}

impl IntoPaths for Vec<String> {
    fn into_paths(self) -> Vec<String> {
        self
    }
}
