//! Handler contracts.
//!
//! Both kinds of handler receive the request and the [`Reply`] under
//! construction. A routing [`Handler`] owns the request once its route
//! matched, so it simply completes the reply. A [`Middleware`] runs in front
//! of other groups and decides, per invocation, whether it handled the request
//! or whether dispatch should fall through to the next candidate. An
//! [`ErrorHandler`] completes replies that end in an error status without a
//! body.
//!
//! The traits are implemented for `async fn` items of the matching shape:
//!
//! ```rust
//! use httpdispatch::{BoxError, Handler, Middleware, Next, Reply};
//! use hyper::{Body, Request};
//!
//! async fn hello(_: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
//!     reply.send("hello")?;
//!     Ok(())
//! }
//!
//! async fn only_json(req: &mut Request<Body>, reply: &mut Reply) -> Result<Next, BoxError> {
//!     if req.headers().contains_key("content-type") {
//!         return Ok(Next::Fallthrough);
//!     }
//!     reply.status(hyper::StatusCode::UNSUPPORTED_MEDIA_TYPE)?.send(())?;
//!     Ok(Next::Handled)
//! }
//!
//! fn assert_handler<H: Handler>(_: H) {}
//! fn assert_middleware<M: Middleware>(_: M) {}
//!
//! assert_handler(hello);
//! assert_middleware(only_json);
//! ```

use crate::reply::Reply;

use futures_util::future::BoxFuture;
use hyper::{Body, Request, StatusCode};
use std::future::Future;

/// Error type returned by handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What a [`Middleware`] decided for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// The reply is complete; dispatch stops here.
    Handled,
    /// Not handled; continue with the next handler or group.
    Fallthrough,
}

/// The error an [`ErrorHandler`] is asked to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpError {
    pub status: StatusCode,
    /// The canonical reason phrase of `status`.
    pub message: &'static str,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            message: status.canonical_reason().unwrap_or("Unknown Status"),
        }
    }
}

/// A routing handler.
pub trait Handler: Send + Sync {
    fn handle<'a>(
        &'a self,
        req: &'a mut Request<Body>,
        reply: &'a mut Reply,
    ) -> BoxFuture<'a, Result<(), BoxError>>;
}

/// A middleware handler.
pub trait Middleware: Send + Sync {
    fn handle<'a>(
        &'a self,
        req: &'a mut Request<Body>,
        reply: &'a mut Reply,
    ) -> BoxFuture<'a, Result<Next, BoxError>>;
}

/// An async function usable as a [`Handler`].
///
/// Implemented for every `Fn(&mut Request<Body>, &mut Reply)` whose future
/// borrows its arguments, which covers plain `async fn` items.
pub trait HandlerFn<'a>: Send + Sync {
    type Future: Future<Output = Result<(), BoxError>> + Send + 'a;

    fn call(&self, req: &'a mut Request<Body>, reply: &'a mut Reply) -> Self::Future;
}

impl<'a, F, Fut> HandlerFn<'a> for F
where
    F: Fn(&'a mut Request<Body>, &'a mut Reply) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'a,
{
    type Future = Fut;

    fn call(&self, req: &'a mut Request<Body>, reply: &'a mut Reply) -> Fut {
        self(req, reply)
    }
}

impl<F> Handler for F
where
    F: for<'a> HandlerFn<'a>,
{
    fn handle<'a>(
        &'a self,
        req: &'a mut Request<Body>,
        reply: &'a mut Reply,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(HandlerFn::call(self, req, reply))
    }
}

/// An async function usable as a [`Middleware`].
pub trait MiddlewareFn<'a>: Send + Sync {
    type Future: Future<Output = Result<Next, BoxError>> + Send + 'a;

    fn call(&self, req: &'a mut Request<Body>, reply: &'a mut Reply) -> Self::Future;
}

impl<'a, F, Fut> MiddlewareFn<'a> for F
where
    F: Fn(&'a mut Request<Body>, &'a mut Reply) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Next, BoxError>> + Send + 'a,
{
    type Future = Fut;

    fn call(&self, req: &'a mut Request<Body>, reply: &'a mut Reply) -> Fut {
        self(req, reply)
    }
}

impl<F> Middleware for F
where
    F: for<'a> MiddlewareFn<'a>,
{
    fn handle<'a>(
        &'a self,
        req: &'a mut Request<Body>,
        reply: &'a mut Reply,
    ) -> BoxFuture<'a, Result<Next, BoxError>> {
        Box::pin(MiddlewareFn::call(self, req, reply))
    }
}

/// Renders replies that finished with a `4xx` or `5xx` status and no body.
pub trait ErrorHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        error: HttpError,
        req: &'a mut Request<Body>,
        reply: &'a mut Reply,
    ) -> BoxFuture<'a, Result<(), BoxError>>;
}

/// An async function usable as an [`ErrorHandler`].
pub trait ErrorHandlerFn<'a>: Send + Sync {
    type Future: Future<Output = Result<(), BoxError>> + Send + 'a;

    fn call(
        &self,
        error: HttpError,
        req: &'a mut Request<Body>,
        reply: &'a mut Reply,
    ) -> Self::Future;
}

impl<'a, F, Fut> ErrorHandlerFn<'a> for F
where
    F: Fn(HttpError, &'a mut Request<Body>, &'a mut Reply) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'a,
{
    type Future = Fut;

    fn call(&self, error: HttpError, req: &'a mut Request<Body>, reply: &'a mut Reply) -> Fut {
        self(error, req, reply)
    }
}

impl<F> ErrorHandler for F
where
    F: for<'a> ErrorHandlerFn<'a>,
{
    fn handle<'a>(
        &'a self,
        error: HttpError,
        req: &'a mut Request<Body>,
        reply: &'a mut Reply,
    ) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(ErrorHandlerFn::call(self, error, req, reply))
    }
}
