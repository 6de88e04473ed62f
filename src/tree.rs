//! The path trie behind every router group.
//!
//! A [`PathRouter`] holds the routes of one HTTP method. Registered paths are
//! split into components and stored one component per [`Node`]:
//!
//! ```ignore
//!  /users               root ── users ── (handler)
//!  /users/:id                             └── :id ── (handler)
//!  /users/:id/posts                                   └── posts ── (handler)
//! ```
//!
//! Lookup walks the request path one component at a time. An exact literal
//! child always wins; only when there is none does the walk descend into the
//! node's dynamic child, binding the component to the parameter name. There is
//! no backtracking: with `/users/new/edit` and `/users/:id` registered,
//! `/users/new` does not match, because the literal `new` node has no handler.
//!
//! A node has at most one dynamic child, so two routes that use different
//! parameter names at the same position conflict:
//!
//! ```ignore
//!  /users/:id        ok
//!  /users/:userId    error: parameter name conflict
//! ```
//!
//! This rules out sibling dynamic alternatives (`/:a` and `/:b` at the same
//! depth leading to different routes). It is a limitation of the design, kept
//! so every request maps onto at most one parameter name per position.

use crate::error::InsertError;
use crate::params::Params;
use crate::path::{self, Segment};

use std::collections::HashMap;
use std::fmt;

/// A single trie node.
pub struct Node<T> {
    children: HashMap<String, Node<T>>,
    dynamic: Option<Box<Dynamic<T>>>,
    value: Option<T>,
}

struct Dynamic<T> {
    name: String,
    node: Node<T>,
}

impl<T> Node<T> {
    /// The value stored at this node, if a route terminates here.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The literal child reached by `segment`.
    pub fn child(&self, segment: &str) -> Option<&Node<T>> {
        self.children.get(segment)
    }

    /// The parameter name and node of the dynamic child.
    pub fn dynamic_child(&self) -> Option<(&str, &Node<T>)> {
        self.dynamic
            .as_deref()
            .map(|dynamic| (dynamic.name.as_str(), &dynamic.node))
    }
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            dynamic: None,
            value: None,
        }
    }
}

impl<T> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("children", &self.children)
            .field("dynamic", &self.dynamic_child())
            .field("value", &self.value.is_some())
            .finish()
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct Match<'r, T> {
    /// The value registered for the matched route.
    pub value: &'r T,
    /// Parameters captured along the way, left to right.
    pub params: Params,
}

/// A trie of routes for a single HTTP method.
///
/// ```rust
/// use httpdispatch::tree::PathRouter;
///
/// let mut router = PathRouter::new();
/// router.insert("/users/:id", "user").unwrap();
///
/// let matched = router.at("/users/42").unwrap();
/// assert_eq!(*matched.value, "user");
/// assert_eq!(matched.params.get("id"), Some("42"));
///
/// assert!(router.insert("/users/:userId", "other").is_err());
/// ```
pub struct PathRouter<T> {
    root: Node<T>,
    case_sensitive: bool,
    len: usize,
}

impl<T> PathRouter<T> {
    /// Creates an empty, case sensitive router.
    pub fn new() -> Self {
        Self {
            root: Node::default(),
            case_sensitive: true,
            len: 0,
        }
    }

    /// Creates an empty router whose literal segments ignore case.
    ///
    /// Literals are folded to lowercase on insert and request paths are folded
    /// before lookup. Parameter names keep their spelling; captured values are
    /// taken from the folded path.
    pub fn case_insensitive() -> Self {
        Self {
            case_sensitive: false,
            ..Self::new()
        }
    }

    /// Registers `value` under `path`.
    ///
    /// Fails if the path is malformed, if a different parameter name already
    /// occupies one of its dynamic positions, or if the exact route exists.
    pub fn insert(&mut self, path: &str, value: T) -> Result<(), InsertError> {
        let segments = path::segments(path)?;
        let case_sensitive = self.case_sensitive;

        let mut node = &mut self.root;
        for segment in segments {
            node = match segment {
                Segment::Literal(literal) => {
                    let key = if case_sensitive {
                        literal.to_owned()
                    } else {
                        literal.to_lowercase()
                    };
                    node.children.entry(key).or_default()
                }
                Segment::Param(name) => {
                    let dynamic = node.dynamic.get_or_insert_with(|| {
                        Box::new(Dynamic {
                            name: name.to_owned(),
                            node: Node::default(),
                        })
                    });

                    if dynamic.name != name {
                        return Err(InsertError::ParamConflict {
                            path: path.to_owned(),
                            name: name.to_owned(),
                            existing: dynamic.name.clone(),
                        });
                    }

                    &mut dynamic.node
                }
            };
        }

        if node.value.is_some() {
            return Err(InsertError::Duplicate {
                path: path.to_owned(),
            });
        }

        node.value = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Looks up the route matching `path`.
    pub fn at(&self, path: &str) -> Option<Match<'_, T>> {
        let path = path::normalize(path, self.case_sensitive);
        let mut params = Params::new();
        let mut node = &self.root;

        if path != "/" {
            for component in path::components(&path) {
                node = match node.children.get(component) {
                    Some(child) => child,
                    None => {
                        let dynamic = node.dynamic.as_deref().filter(|_| !component.is_empty())?;
                        params.push(&dynamic.name, component);
                        &dynamic.node
                    }
                };
            }
        }

        node.value.as_ref().map(|value| Match { value, params })
    }

    /// The root node of the trie.
    pub fn root(&self) -> &Node<T> {
        &self.root
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for PathRouter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PathRouter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathRouter")
            .field("root", &self.root)
            .field("case_sensitive", &self.case_sensitive)
            .field("len", &self.len)
            .finish()
    }
}
