use crate::handler::BoxError;
use crate::route::RouteMethod;

use std::io;
use thiserror::Error;

/// A route that could not be inserted into a [`PathRouter`](crate::tree::PathRouter).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InsertError {
    #[error("invalid route '{path}': the path must start with a slash")]
    MissingLeadingSlash { path: String },

    #[error("invalid route '{path}': empty path segment")]
    EmptySegment { path: String },

    #[error("invalid route '{path}': a parameter must span a whole path segment")]
    MisplacedParam { path: String },

    #[error("invalid route '{path}': parameter ':{name}' is used more than once")]
    DuplicateParam { path: String, name: String },

    #[error(
        "cannot create route '{path}' with parameter ':{name}' because a route already exists \
         with parameter ':{existing}' in the same location"
    )]
    ParamConflict {
        path: String,
        name: String,
        existing: String,
    },

    #[error("cannot create route '{path}' because a route already exists in the same location")]
    Duplicate { path: String },
}

/// Setup-time failure returned by [`DispatcherBuilder::build`](crate::DispatcherBuilder::build).
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("failed to register {method} route: {source}")]
    Route {
        method: RouteMethod,
        #[source]
        source: InsertError,
    },

    #[error("an error handler is already set")]
    DuplicateErrorHandler,

    #[error("middleware path pattern cannot be empty")]
    EmptyPattern,

    #[error("invalid middleware path pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Misuse of a [`Reply`](crate::Reply).
#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("the response has already been sent")]
    AlreadySent,

    #[error("invalid header: {source}")]
    InvalidHeader {
        #[from]
        source: hyper::http::Error,
    },
}

/// Failure while dispatching a request.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("handler failed for '{path}': {source}")]
    Handler {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("cannot complete response: {source}")]
    Reply {
        #[from]
        source: ReplyError,
    },
}

/// Failure while building a [`StaticDir`](crate::fs::StaticDir) snapshot.
#[derive(Error, Debug)]
pub enum StaticError {
    #[error("invalid exclude pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl BuildError {
    pub(crate) fn pattern<S: ToString>(pattern: S, source: glob::PatternError) -> Self {
        Self::Pattern {
            pattern: pattern.to_string(),
            source,
        }
    }
}

impl DispatchError {
    pub(crate) fn handler<S: ToString>(path: S, source: BoxError) -> Self {
        Self::Handler {
            path: path.to_string(),
            source,
        }
    }
}
