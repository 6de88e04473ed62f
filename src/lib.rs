//! # HttpDispatch
//!
//! HttpDispatch is a request dispatcher for [hyper](https://hyper.rs) servers.
//!
//! A dispatcher is an ordered list of *groups*. Each request is offered to the
//! groups in the order they were registered, and the first group that handles it
//! produces the response. There are three kinds of groups: middleware chains
//! selected by glob patterns, routers backed by a path trie, and static file
//! indexes.
//!
//! ## Features
//!
//! **Registration order is priority:** Middleware registered before your routes
//! sees requests first, and static files registered after them only answer what
//! the routes did not. There are no hidden precedence rules between groups.
//!
//! **Fallthrough middleware:** A middleware decides per request whether it
//! handled it (`Next::Handled`) or whether dispatch should continue
//! (`Next::Fallthrough`). Headers it sets on the way stay on the reply.
//!
//! **Parameters in your routing pattern:** Give a path segment a name and the
//! router delivers its value to you through the request extensions.
//!
//! **Conflicts are caught at startup:** Ambiguous routes, duplicate routes and
//! invalid glob patterns make [`DispatcherBuilder::build`] fail with an error
//! naming the offending path.
//!
//! ## Usage
//!
//! Here is a simple example:
//!
//! ```rust,no_run
//! use httpdispatch::{BoxError, Dispatcher, Next, Params, Reply};
//! use hyper::{Body, Request};
//!
//! async fn powered_by(_: &mut Request<Body>, reply: &mut Reply) -> Result<Next, BoxError> {
//!     reply.header("x-powered-by", "httpdispatch")?;
//!     Ok(Next::Fallthrough)
//! }
//!
//! async fn index(_: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
//!     reply.send("Hello, World!")?;
//!     Ok(())
//! }
//!
//! async fn hello(req: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
//!     let user = req
//!         .extensions()
//!         .get::<Params>()
//!         .and_then(|params| params.get("user"))
//!         .unwrap_or("stranger")
//!         .to_owned();
//!     reply.send(format!("Hello, {}", user))?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::builder()
//!         .use_all(powered_by)
//!         .get("/", index)
//!         .get("/hello/:user", hello)
//!         .build()?;
//!
//!     hyper::Server::bind(&([127, 0, 0, 1], 3000).into())
//!         .serve(dispatcher.into_service())
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Named parameters
//!
//! As you can see, `:user` is a *named parameter*. The values are accessible via
//! `req.extensions().get::<Params>()`.
//!
//! Named parameters only match a single, non-empty path segment:
//!
//! ```ignore
//! Pattern: /user/:user
//!
//!  /user/gordon              match
//!  /user/gordon/             match
//!  /user/gordon/profile      no match
//!  /user/                    no match
//! ```
//!
//! A literal segment always wins over a parameter at the same position, so
//! `/user/new` and `/user/:user` can be registered side by side. Two
//! different parameter names at the same position can not; see [`tree`] for
//! the details.
//!
//! ### Case sensitivity
//!
//! By default request paths are lowercased once, before any group sees them,
//! and routes and middleware patterns are compared without regard to case.
//! Static files are looked up with the same lowercased path, so a file whose
//! name contains uppercase letters is only reachable with
//! [`DispatcherBuilder::case_sensitive`] turned on.
//!
//! ### Middleware
//!
//! Middleware is selected by glob patterns (`*` matches within one path
//! segment, `**` across segments) and optionally by method:
//!
//! ```rust
//! use httpdispatch::{BoxError, Dispatcher, Next, Reply};
//! use hyper::{Body, Method, Request, StatusCode};
//!
//! async fn require_token(req: &mut Request<Body>, reply: &mut Reply) -> Result<Next, BoxError> {
//!     if req.headers().contains_key("authorization") {
//!         return Ok(Next::Fallthrough);
//!     }
//!     reply.status(StatusCode::UNAUTHORIZED)?.send("missing token")?;
//!     Ok(Next::Handled)
//! }
//!
//! let dispatcher = Dispatcher::builder()
//!     .middleware_for(Method::POST, "/api/**", require_token)
//!     .build();
//! assert!(dispatcher.is_ok());
//! ```
//!
//! ### Static files
//!
//! You can use the dispatcher to serve files from a directory. Directories can
//! be answered with `403 Forbidden` instead of being passed on:
//!
//! ```rust,no_run
//! use httpdispatch::fs::{StaticDir, StaticOptions};
//! use httpdispatch::Dispatcher;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let public = StaticDir::open("public", StaticOptions {
//!     forbid_directories: true,
//!     exclude_dot_files: true,
//!     ..StaticOptions::default()
//! })?;
//!
//! let dispatcher = Dispatcher::builder().serve_static(public).build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Not Found Handler
//!
//! When no group handles a request, the dispatcher answers with a small HTML
//! `404` page. Use [`DispatcherBuilder::not_found`] to supply your own:
//!
//! ```rust
//! use httpdispatch::{BoxError, Dispatcher, Reply};
//! use hyper::{Body, Request};
//!
//! async fn not_found(_: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
//!     reply.header("content-type", "application/json")?;
//!     reply.send(r#"{"error":"not found"}"#)?;
//!     Ok(())
//! }
//!
//! let dispatcher = Dispatcher::builder().not_found(not_found).build();
//! assert!(dispatcher.is_ok());
//! ```
//!
//! ### Error Handler
//!
//! Replies that end with a `4xx` or `5xx` status and no body, including the
//! built-in `403` and `404` pages, can be rendered by an error handler set with
//! [`DispatcherBuilder::error`]. It receives the status and its reason phrase
//! as an [`HttpError`].
//!
//! ### Multi-domain / Sub-domains
//!
//! Does your server serve multiple domains / hosts? Define a dispatcher per host!
//!
//! ```rust,no_run
//! use httpdispatch::{BoxError, Dispatcher, Reply};
//! use hyper::service::{make_service_fn, service_fn};
//! use hyper::{Body, Request, Response, Server, StatusCode};
//! use std::collections::HashMap;
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! pub struct HostSwitch(HashMap<String, Dispatcher>);
//!
//! impl HostSwitch {
//!     async fn serve(&self, req: Request<Body>) -> Response<Body> {
//!         let host = req.headers().get("host").and_then(|host| host.to_str().ok());
//!         match host.and_then(|host| self.0.get(host)) {
//!             Some(dispatcher) => dispatcher.serve(req).await,
//!             None => {
//!                 let mut forbidden = Response::new(Body::empty());
//!                 *forbidden.status_mut() = StatusCode::FORBIDDEN;
//!                 forbidden
//!             }
//!         }
//!     }
//! }
//!
//! async fn hello(_: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
//!     reply.send("hello")?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::builder().get("/", hello).build()?;
//!
//!     let mut host_switch = HostSwitch(HashMap::new());
//!     host_switch.0.insert("example.com:12345".into(), dispatcher);
//!
//!     let host_switch = Arc::new(host_switch);
//!
//!     let make_svc = make_service_fn(move |_| {
//!         let host_switch = host_switch.clone();
//!         async move {
//!             Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
//!                 let host_switch = host_switch.clone();
//!                 async move { Ok::<_, Infallible>(host_switch.serve(req).await) }
//!             }))
//!         }
//!     });
//!
//!     Server::bind(&([127, 0, 0, 1], 3000).into())
//!         .serve(make_svc)
//!         .await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod dispatcher;
mod error;
mod group;
mod handler;
mod params;
pub(crate) mod path;
mod reply;
mod route;

pub mod fs;
pub mod tree;

#[doc(inline)]
pub use dispatcher::{DispatchService, Dispatcher, DispatcherBuilder, MakeDispatchService};

#[doc(inline)]
pub use error::{BuildError, DispatchError, InsertError, ReplyError, StaticError};

#[doc(inline)]
pub use handler::{
    BoxError, ErrorHandler, ErrorHandlerFn, Handler, HandlerFn, HttpError, Middleware,
    MiddlewareFn, Next,
};

pub use params::{Param, Params};
pub use reply::{Reply, ReplyBody};
pub use route::{IntoPaths, RouteMethod};
