use crate::error::{BuildError, DispatchError};
use crate::fs::StaticFileIndex;
use crate::group::{
    ClassicEntry, ClassicGroup, Group, GroupKind, Outcome, PathPattern, RouterGroup, StaticGroup,
};
use crate::handler::{ErrorHandler, Handler, HttpError, Middleware};
use crate::path;
use crate::reply::{status_response, Reply};
use crate::route::{IntoPaths, RouteMethod};

use std::convert::Infallible;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::{self, BoxFuture};
use hyper::service::Service;
use hyper::{Body, Method, Request, Response, StatusCode};
use tracing::{debug, error, info, trace};

enum Registration {
    Static(Arc<dyn StaticFileIndex>),
    Route {
        method: RouteMethod,
        paths: Vec<String>,
        handler: Arc<dyn Handler>,
    },
    Middleware {
        method: RouteMethod,
        patterns: Vec<String>,
        handlers: Vec<Arc<dyn Middleware>>,
    },
}

/// Collects registrations and builds a [`Dispatcher`].
///
/// Every registration either extends the most recently registered group, if it
/// is of the same kind, or starts a new one. The resulting sequence of groups
/// is the order in which requests are offered to them:
///
/// ```rust
/// use httpdispatch::{BoxError, DispatcherBuilder, Next, Reply};
/// use hyper::{Body, Request};
///
/// async fn log(req: &mut Request<Body>, _: &mut Reply) -> Result<Next, BoxError> {
///     println!("{} {}", req.method(), req.uri());
///     Ok(Next::Fallthrough)
/// }
///
/// async fn index(_: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
///     reply.send("index")?;
///     Ok(())
/// }
///
/// let dispatcher = DispatcherBuilder::new()
///     .use_all(log)               // classic group
///     .get("/", index)            // router group
///     .get(["/home", "/index"], index)
///     .build()?;
/// # Ok::<_, httpdispatch::BuildError>(())
/// ```
///
/// Route conflicts and invalid patterns are reported by [`build`](Self::build).
pub struct DispatcherBuilder {
    registrations: Vec<Registration>,
    case_sensitive: bool,
    not_found: Option<Arc<dyn Handler>>,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            case_sensitive: false,
            not_found: None,
            error_handlers: Vec::new(),
        }
    }

    /// Serves the files of `index` to `GET` requests.
    pub fn serve_static(mut self, index: impl StaticFileIndex + 'static) -> Self {
        self.registrations.push(Registration::Static(Arc::new(index)));
        self
    }

    /// Registers a routing handler for `method` on one or more paths.
    /// ```rust
    /// use httpdispatch::{BoxError, DispatcherBuilder, Reply, RouteMethod};
    /// use hyper::{Body, Method, Request};
    ///
    /// async fn teapot(_: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
    ///     reply.status(hyper::StatusCode::IM_A_TEAPOT)?.send("I am a teapot!")?;
    ///     Ok(())
    /// }
    ///
    /// let dispatcher = DispatcherBuilder::new()
    ///     .route(Method::GET, "/teapot", teapot)
    ///     .route(RouteMethod::Any, "/kettle", teapot)
    ///     .build();
    /// assert!(dispatcher.is_ok());
    /// ```
    pub fn route(
        mut self,
        method: impl Into<RouteMethod>,
        paths: impl IntoPaths,
        handler: impl Handler + 'static,
    ) -> Self {
        self.registrations.push(Registration::Route {
            method: method.into(),
            paths: paths.into_paths(),
            handler: Arc::new(handler),
        });
        self
    }

    /// Register a handler for `GET` requests
    pub fn get(self, paths: impl IntoPaths, handler: impl Handler + 'static) -> Self {
        self.route(Method::GET, paths, handler)
    }

    /// Register a handler for `HEAD` requests
    pub fn head(self, paths: impl IntoPaths, handler: impl Handler + 'static) -> Self {
        self.route(Method::HEAD, paths, handler)
    }

    /// Register a handler for `OPTIONS` requests
    pub fn options(self, paths: impl IntoPaths, handler: impl Handler + 'static) -> Self {
        self.route(Method::OPTIONS, paths, handler)
    }

    /// Register a handler for `POST` requests
    pub fn post(self, paths: impl IntoPaths, handler: impl Handler + 'static) -> Self {
        self.route(Method::POST, paths, handler)
    }

    /// Register a handler for `PUT` requests
    pub fn put(self, paths: impl IntoPaths, handler: impl Handler + 'static) -> Self {
        self.route(Method::PUT, paths, handler)
    }

    /// Register a handler for `PATCH` requests
    pub fn patch(self, paths: impl IntoPaths, handler: impl Handler + 'static) -> Self {
        self.route(Method::PATCH, paths, handler)
    }

    /// Register a handler for `DELETE` requests
    pub fn delete(self, paths: impl IntoPaths, handler: impl Handler + 'static) -> Self {
        self.route(Method::DELETE, paths, handler)
    }

    /// Register a handler for requests of any method.
    ///
    /// Within a group, a route registered for the exact method of a request
    /// takes precedence.
    pub fn any(self, paths: impl IntoPaths, handler: impl Handler + 'static) -> Self {
        self.route(RouteMethod::Any, paths, handler)
    }

    /// Register a handler for `GET`, `POST`, `PUT`, `DELETE` and `HEAD` requests.
    pub fn all(mut self, paths: impl IntoPaths, handler: impl Handler + 'static) -> Self {
        let handler: Arc<dyn Handler> = Arc::new(handler);
        let paths = paths.into_paths();

        for method in &[Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            self.registrations.push(Registration::Route {
                method: method.clone().into(),
                paths: paths.clone(),
                handler: handler.clone(),
            });
        }

        self
    }

    /// Adds middleware for requests whose path matches one of the glob
    /// `patterns`. `*` and `**` match every path.
    pub fn middleware(self, patterns: impl IntoPaths, handler: impl Middleware + 'static) -> Self {
        self.middleware_for(RouteMethod::Any, patterns, handler)
    }

    /// Adds middleware restricted to requests of `method`.
    pub fn middleware_for(
        self,
        method: impl Into<RouteMethod>,
        patterns: impl IntoPaths,
        handler: impl Middleware + 'static,
    ) -> Self {
        let handler: Arc<dyn Middleware> = Arc::new(handler);
        self.middleware_chain(method, patterns, vec![handler])
    }

    /// Adds middleware that sees every request.
    pub fn use_all(self, handler: impl Middleware + 'static) -> Self {
        self.middleware("**", handler)
    }

    /// Adds a chain of middleware sharing the same patterns. The handlers run
    /// in order until one of them returns [`Next::Handled`](crate::Next::Handled).
    pub fn middleware_chain(
        mut self,
        method: impl Into<RouteMethod>,
        patterns: impl IntoPaths,
        handlers: Vec<Arc<dyn Middleware>>,
    ) -> Self {
        self.registrations.push(Registration::Middleware {
            method: method.into(),
            patterns: patterns.into_paths(),
            handlers,
        });
        self
    }

    /// Match paths case sensitively. Disabled by default, in which case request
    /// paths are lowercased before they are matched.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Configurable handler which is called when no group handles a request.
    /// The status is set to `404` before the handler runs.
    pub fn not_found(mut self, handler: impl Handler + 'static) -> Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    /// Handler which completes replies that end with a `4xx` or `5xx` status
    /// and no body: the built-in `403` and `404` pages, and error statuses set
    /// by other handlers without sending a body.
    ///
    /// ```rust
    /// use httpdispatch::{BoxError, Dispatcher, HttpError, Reply};
    /// use hyper::{Body, Request};
    ///
    /// async fn json_error(
    ///     error: HttpError,
    ///     _: &mut Request<Body>,
    ///     reply: &mut Reply,
    /// ) -> Result<(), BoxError> {
    ///     reply.header("content-type", "application/json")?;
    ///     reply.send(format!(r#"{{"error":"{}"}}"#, error.message))?;
    ///     Ok(())
    /// }
    ///
    /// let dispatcher = Dispatcher::builder().error(json_error).build();
    /// assert!(dispatcher.is_ok());
    /// ```
    ///
    /// Only one error handler may be set; [`build`](Self::build) fails
    /// otherwise.
    pub fn error(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handlers.push(Arc::new(handler));
        self
    }

    /// Builds the dispatcher, failing on the first invalid registration.
    pub fn build(mut self) -> Result<Dispatcher, BuildError> {
        if self.error_handlers.len() > 1 {
            return Err(BuildError::DuplicateErrorHandler);
        }

        let case_sensitive = self.case_sensitive;
        let error_handler = self.error_handlers.pop();
        let mut groups: Vec<Group> = Vec::new();

        for registration in self.registrations {
            match registration {
                Registration::Static(index) => {
                    if !matches!(groups.last(), Some(Group::Static(_))) {
                        groups.push(Group::Static(StaticGroup::new()));
                    }

                    if let Some(Group::Static(group)) = groups.last_mut() {
                        group.push(index);
                    }
                }
                Registration::Route { method, paths, handler } => {
                    if !matches!(groups.last(), Some(Group::Router(_))) {
                        groups.push(Group::Router(RouterGroup::new(case_sensitive)));
                    }

                    if let Some(Group::Router(group)) = groups.last_mut() {
                        for path in &paths {
                            group.insert(&method, path, handler.clone()).map_err(|source| {
                                BuildError::Route {
                                    method: method.clone(),
                                    source,
                                }
                            })?;
                        }
                    }
                }
                Registration::Middleware { method, patterns, handlers } => {
                    let patterns = patterns
                        .iter()
                        .map(|pattern| compile(pattern, case_sensitive))
                        .collect::<Result<Vec<_>, _>>()?;

                    if !matches!(groups.last(), Some(Group::Classic(_))) {
                        groups.push(Group::Classic(ClassicGroup::new(case_sensitive)));
                    }

                    if let Some(Group::Classic(group)) = groups.last_mut() {
                        group.push(ClassicEntry {
                            patterns,
                            method,
                            handlers,
                        });
                    }
                }
            }
        }

        info!(groups = groups.len(), case_sensitive, "built dispatcher");

        Ok(Dispatcher {
            groups,
            case_sensitive,
            not_found: self.not_found,
            error_handler,
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str, case_sensitive: bool) -> Result<PathPattern, BuildError> {
    if pattern.is_empty() {
        return Err(BuildError::EmptyPattern);
    }

    PathPattern::new(pattern, case_sensitive).map_err(|source| BuildError::pattern(pattern, source))
}

/// Dispatches requests to an ordered sequence of middleware, router and static
/// file groups.
///
/// Groups are tried in registration order. A group either produces the
/// response, falls through (its middleware ran but did not handle the request)
/// or does not apply; in the last two cases the next group is tried. When no
/// group handles the request the response is `404 Not Found`.
pub struct Dispatcher {
    groups: Vec<Group>,
    case_sensitive: bool,
    not_found: Option<Arc<dyn Handler>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Runs the request through the groups and returns the completed reply.
    ///
    /// Any handler error aborts dispatch; no further group or handler runs.
    pub async fn dispatch(&self, req: &mut Request<Body>) -> Result<Reply, DispatchError> {
        let path = path::normalize(req.uri().path(), self.case_sensitive).into_owned();
        let mut reply = Reply::new();

        debug!(method = %req.method(), path = %path, "dispatching request");

        for (index, group) in self.groups.iter().enumerate() {
            let outcome = group
                .attempt(req, &mut reply, &path)
                .await
                .map_err(|source| DispatchError::handler(&path, source))?;

            let kind = group.kind();
            match outcome {
                Outcome::Terminal => {
                    debug!(group = index, %kind, status = %reply.status_code(), "request handled");
                    self.complete(req, &mut reply, &path).await?;
                    return Ok(reply);
                }
                Outcome::Fallthrough => trace!(group = index, %kind, "group fell through"),
                Outcome::Inapplicable => trace!(group = index, %kind, "group skipped"),
            }
        }

        debug!(path = %path, "no group handled the request");

        match &self.not_found {
            Some(handler) => {
                reply.status(StatusCode::NOT_FOUND)?;
                Handler::handle(&**handler, req, &mut reply)
                    .await
                    .map_err(|source| DispatchError::handler(&path, source))?;
            }
            None => reply.send_status(StatusCode::NOT_FOUND)?,
        }

        self.complete(req, &mut reply, &path).await?;
        Ok(reply)
    }

    // Runs the error handler for bodiless error replies, then freezes the reply.
    async fn complete(
        &self,
        req: &mut Request<Body>,
        reply: &mut Reply,
        path: &str,
    ) -> Result<(), DispatchError> {
        if let Some(handler) = &self.error_handler {
            if reply.is_bodiless_error() {
                let error = HttpError::new(reply.status_code());
                trace!(status = %error.status, "running error handler");

                reply.reopen();
                ErrorHandler::handle(&**handler, error, req, reply)
                    .await
                    .map_err(|source| DispatchError::handler(path, source))?;
            }
        }

        reply.finish();
        Ok(())
    }

    /// An asynchronous function from a `Request` to a `Response`. You will generally not need to
    /// use this function directly, and instead use
    /// [`Dispatcher::into_service`](crate::Dispatcher::into_service). However, it may be useful
    /// when incorporating the dispatcher into a larger service.
    ///
    /// Dispatch errors are logged and answered with `500 Internal Server Error`.
    /// ```rust,no_run
    /// # use httpdispatch::Dispatcher;
    /// # use hyper::service::{make_service_fn, service_fn};
    /// # use hyper::{Request, Body, Server};
    /// # use std::convert::Infallible;
    /// # use std::sync::Arc;
    ///
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let dispatcher = Arc::new(Dispatcher::builder().build()?);
    ///
    /// let make_svc = make_service_fn(move |_| {
    ///     let dispatcher = dispatcher.clone();
    ///     async move {
    ///         Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
    ///             let dispatcher = dispatcher.clone();
    ///             async move { Ok::<_, Infallible>(dispatcher.serve(req).await) }
    ///         }))
    ///     }
    /// });
    ///
    /// Server::bind(&([127, 0, 0, 1], 3000).into())
    ///     .serve(make_svc)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn serve(&self, mut req: Request<Body>) -> Response<Body> {
        let reply = match self.dispatch(&mut req).await {
            Ok(reply) => reply,
            Err(e) => {
                let (method, path) = (req.method(), req.uri().path());
                error!(%method, %path, cause = %e, "failed to dispatch request");
                return status_response(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        match reply.into_response().await {
            Ok(response) => response,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                error!(path = %req.uri().path(), cause = %e, "response file not found");
                status_response(StatusCode::NOT_FOUND)
            }
            Err(e) => {
                error!(path = %req.uri().path(), cause = %e, "failed to read response body");
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Converts the `Dispatcher` into a `Service` which you can serve directly with `Hyper`.
    /// If you have an existing `Service` that you want to incorporate a `Dispatcher` into, see
    /// [`Dispatcher::serve`](crate::Dispatcher::serve).
    /// ```rust,no_run
    /// # use httpdispatch::Dispatcher;
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// // Our dispatcher...
    /// let dispatcher = Dispatcher::builder().build()?;
    ///
    /// // Convert it into a service...
    /// let service = dispatcher.into_service();
    ///
    /// // Serve with hyper
    /// hyper::Server::bind(&([127, 0, 0, 1], 3030).into())
    ///     .serve(service)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn into_service(self) -> MakeDispatchService {
        MakeDispatchService(DispatchService(Arc::new(self)))
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds = self.groups.iter().map(Group::kind).collect::<Vec<GroupKind>>();

        f.debug_struct("Dispatcher")
            .field("groups", &kinds)
            .field("case_sensitive", &self.case_sensitive)
            .field("not_found", &self.not_found.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

#[doc(hidden)]
pub struct MakeDispatchService(DispatchService);

impl<T> Service<T> for MakeDispatchService {
    type Response = DispatchService;
    type Error = Infallible;
    type Future = future::Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _: T) -> Self::Future {
        future::ok(self.0.clone())
    }
}

#[doc(hidden)]
#[derive(Clone)]
pub struct DispatchService(Arc<Dispatcher>);

impl Service<Request<Body>> for DispatchService {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let dispatcher = self.0.clone();
        Box::pin(async move { Ok(dispatcher.serve(req).await) })
    }
}
