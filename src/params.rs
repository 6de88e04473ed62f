use std::ops::Index;
use std::slice;

/// A single named parameter captured by a route lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

/// Parameters captured by a route lookup, in the order they appear in the path.
///
/// The dispatcher inserts them into the request extensions before the route
/// handler runs:
///
/// ```rust
/// # use httpdispatch::Params;
/// # use hyper::{Body, Request};
/// # let req = Request::new(Body::empty());
/// let user = req.extensions().get::<Params>().and_then(|params| params.get("user"));
/// # assert!(user.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: Vec<Param>,
}

impl Params {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of the first parameter registered under `key`.
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.inner
            .iter()
            .find(|param| param.key == key)
            .map(|param| param.value.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Param> {
        self.inner.iter()
    }

    pub(crate) fn push(&mut self, key: &str, value: &str) {
        self.inner.push(Param {
            key: key.to_owned(),
            value: value.to_owned(),
        });
    }
}

impl Index<usize> for Params {
    type Output = Param;

    fn index(&self, index: usize) -> &Param {
        &self.inner[index]
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
