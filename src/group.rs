//! The three kinds of dispatch groups.

use crate::error::InsertError;
use crate::fs::{StaticEntry, StaticFileIndex};
use crate::handler::{BoxError, Handler, Middleware, Next};
use crate::reply::Reply;
use crate::route::RouteMethod;
use crate::tree::{Match, PathRouter};

use glob::{MatchOptions, Pattern};
use hyper::header::CACHE_CONTROL;
use hyper::{Body, Method, Request, StatusCode};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The result of offering a request to one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// The reply is complete.
    Terminal,
    /// Handlers ran but all of them fell through.
    Fallthrough,
    /// Nothing in the group applies to the request.
    Inapplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupKind {
    Classic,
    Router,
    Static,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GroupKind::Classic => "classic",
            GroupKind::Router => "router",
            GroupKind::Static => "static",
        })
    }
}

pub(crate) enum Group {
    Classic(ClassicGroup),
    Router(RouterGroup),
    Static(StaticGroup),
}

impl Group {
    pub(crate) fn kind(&self) -> GroupKind {
        match self {
            Group::Classic(_) => GroupKind::Classic,
            Group::Router(_) => GroupKind::Router,
            Group::Static(_) => GroupKind::Static,
        }
    }

    /// Offers the request to the group. `path` is the normalized request path.
    pub(crate) async fn attempt(
        &self,
        req: &mut Request<Body>,
        reply: &mut Reply,
        path: &str,
    ) -> Result<Outcome, BoxError> {
        match self {
            Group::Classic(group) => group.attempt(req, reply, path).await,
            Group::Router(group) => group.attempt(req, reply, path).await,
            Group::Static(group) => group.attempt(req, reply, path),
        }
    }
}

/// A path pattern of a classic middleware entry.
pub(crate) enum PathPattern {
    /// `*` or `**`.
    CatchAll,
    Glob(Pattern),
}

impl PathPattern {
    pub(crate) fn new(pattern: &str, case_sensitive: bool) -> Result<Self, glob::PatternError> {
        match pattern {
            "*" | "**" => Ok(PathPattern::CatchAll),
            _ if case_sensitive => Pattern::new(pattern).map(PathPattern::Glob),
            _ => Pattern::new(&pattern.to_lowercase()).map(PathPattern::Glob),
        }
    }

    fn matches(&self, path: &str, options: MatchOptions) -> bool {
        match self {
            PathPattern::CatchAll => true,
            PathPattern::Glob(pattern) => pattern.matches_with(path, options),
        }
    }
}

pub(crate) struct ClassicEntry {
    pub(crate) patterns: Vec<PathPattern>,
    pub(crate) method: RouteMethod,
    pub(crate) handlers: Vec<Arc<dyn Middleware>>,
}

impl ClassicEntry {
    fn applies(&self, method: &Method, path: &str, options: MatchOptions) -> bool {
        self.method.admits(method) && self.patterns.iter().any(|p| p.matches(path, options))
    }
}

/// Middleware chains selected by glob patterns.
pub(crate) struct ClassicGroup {
    entries: Vec<ClassicEntry>,
    options: MatchOptions,
}

impl ClassicGroup {
    pub(crate) fn new(case_sensitive: bool) -> Self {
        let options = MatchOptions {
            case_sensitive,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        Self {
            entries: Vec::new(),
            options,
        }
    }

    pub(crate) fn push(&mut self, entry: ClassicEntry) {
        self.entries.push(entry);
    }

    async fn attempt(
        &self,
        req: &mut Request<Body>,
        reply: &mut Reply,
        path: &str,
    ) -> Result<Outcome, BoxError> {
        let mut applicable = false;

        for entry in &self.entries {
            if !entry.applies(req.method(), path, self.options) {
                continue;
            }
            applicable = true;

            for handler in &entry.handlers {
                if Middleware::handle(&**handler, req, reply).await? == Next::Handled {
                    return Ok(Outcome::Terminal);
                }
            }
        }

        Ok(if applicable {
            Outcome::Fallthrough
        } else {
            Outcome::Inapplicable
        })
    }
}

/// Routes of one group, one trie per method.
pub(crate) struct RouterGroup {
    routes: HashMap<Method, PathRouter<Arc<dyn Handler>>>,
    any: Option<PathRouter<Arc<dyn Handler>>>,
    case_sensitive: bool,
}

impl RouterGroup {
    pub(crate) fn new(case_sensitive: bool) -> Self {
        Self {
            routes: HashMap::new(),
            any: None,
            case_sensitive,
        }
    }

    pub(crate) fn insert(
        &mut self,
        method: &RouteMethod,
        path: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), InsertError> {
        let case_sensitive = self.case_sensitive;
        let new_router = || {
            if case_sensitive {
                PathRouter::new()
            } else {
                PathRouter::case_insensitive()
            }
        };

        let router = match method {
            RouteMethod::Exact(method) => {
                self.routes.entry(method.clone()).or_insert_with(new_router)
            }
            RouteMethod::Any => self.any.get_or_insert_with(new_router),
        };

        router.insert(path, handler)
    }

    /// Finds the handler for `method` and `path`, falling back to `ANY` routes.
    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<Match<'_, Arc<dyn Handler>>> {
        self.routes
            .get(method)
            .and_then(|router| router.at(path))
            .or_else(|| self.any.as_ref().and_then(|router| router.at(path)))
    }

    async fn attempt(
        &self,
        req: &mut Request<Body>,
        reply: &mut Reply,
        path: &str,
    ) -> Result<Outcome, BoxError> {
        let Match { value: handler, params } = match self.lookup(req.method(), path) {
            Some(matched) => matched,
            None => return Ok(Outcome::Inapplicable),
        };

        req.extensions_mut().insert(params);
        Handler::handle(&**handler, req, reply).await?;

        Ok(Outcome::Terminal)
    }
}

/// Static file indexes, consulted in registration order.
pub(crate) struct StaticGroup {
    indexes: Vec<Arc<dyn StaticFileIndex>>,
}

impl StaticGroup {
    pub(crate) fn new() -> Self {
        Self {
            indexes: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, index: Arc<dyn StaticFileIndex>) {
        self.indexes.push(index);
    }

    fn attempt(
        &self,
        req: &Request<Body>,
        reply: &mut Reply,
        path: &str,
    ) -> Result<Outcome, BoxError> {
        if req.method() != Method::GET {
            return Ok(Outcome::Inapplicable);
        }

        for index in &self.indexes {
            match index.get(path) {
                Some(StaticEntry::Forbidden) => {
                    reply.send_status(StatusCode::FORBIDDEN)?;
                    return Ok(Outcome::Terminal);
                }
                Some(StaticEntry::File(file)) => {
                    if let Some(max_age) = index.max_age() {
                        let value = format!("public, max-age={}", max_age.as_secs());
                        reply.header(CACHE_CONTROL, value)?;
                    }
                    reply.status(StatusCode::OK)?;
                    reply.send_file(file)?;
                    return Ok(Outcome::Terminal);
                }
                None => continue,
            }
        }

        Ok(Outcome::Inapplicable)
    }
}
