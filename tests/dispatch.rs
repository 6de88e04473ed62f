use httpdispatch::fs::{StaticDir, StaticEntry, StaticOptions};
use httpdispatch::{
    BoxError, BuildError, DispatchError, Dispatcher, HttpError, Middleware, Next, Params, Reply,
    ReplyError,
};
use hyper::header::{CACHE_CONTROL, CONTENT_TYPE};
use hyper::service::Service;
use hyper::{Body, Method, Request, Response, StatusCode};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn request(method: Method, path: &str) -> Request<Body> {
    Request::builder().method(method).uri(path).body(Body::empty()).unwrap()
}

async fn body(response: Response<Body>) -> String {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn h1(_: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
    reply.send("h1")?;
    Ok(())
}

async fn h2(_: &mut Request<Body>, reply: &mut Reply) -> Result<Next, BoxError> {
    reply.send("h2")?;
    Ok(Next::Handled)
}

async fn user(req: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
    let params = req.extensions().get::<Params>().cloned().unwrap_or_default();
    let body = params
        .iter()
        .map(|param| format!("{}={}", param.key, param.value))
        .collect::<Vec<_>>()
        .join("&");
    reply.send(body)?;
    Ok(())
}

async fn method_name(req: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
    let method = req.method().to_string();
    reply.send(method)?;
    Ok(())
}

async fn fallthrough(_: &mut Request<Body>, reply: &mut Reply) -> Result<Next, BoxError> {
    reply.header("x-fallthrough", "yes")?;
    Ok(Next::Fallthrough)
}

async fn failing(_: &mut Request<Body>, _: &mut Reply) -> Result<(), BoxError> {
    let err = io::Error::new(io::ErrorKind::Other, "database is down");
    Err(err.into())
}

async fn double_send(_: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
    reply.send("first")?;
    reply.send("second")?;
    Ok(())
}

struct Counter(Arc<AtomicUsize>);

impl Middleware for Counter {
    fn handle<'a>(
        &'a self,
        _req: &'a mut Request<Body>,
        _reply: &'a mut Reply,
    ) -> futures_util::future::BoxFuture<'a, Result<Next, BoxError>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok::<_, BoxError>(Next::Fallthrough) })
    }
}

fn public_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("assets")).unwrap();
    fs::write(dir.path().join("a.txt"), "static a").unwrap();
    fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();
    dir
}

fn public(dir: &TempDir) -> StaticDir {
    StaticDir::open(dir.path(), StaticOptions::default()).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_group_priority() {
    init_tracing();
    let dir = public_dir();

    let dispatcher = Dispatcher::builder()
        .serve_static(public(&dir))
        .get("/b", h1)
        .middleware("*", h2)
        .build()
        .unwrap();

    let response = dispatcher.serve(request(Method::GET, "/a.txt")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    assert_eq!(body(response).await, "static a");

    let response = dispatcher.serve(request(Method::GET, "/b")).await;
    assert_eq!(body(response).await, "h1");

    let response = dispatcher.serve(request(Method::GET, "/c")).await;
    assert_eq!(body(response).await, "h2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_fallthrough_ends_in_not_found() {
    init_tracing();

    let dispatcher = Dispatcher::builder().use_all(fallthrough).build().unwrap();

    let response = dispatcher.serve(request(Method::GET, "/anything")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-fallthrough"], "yes");
    assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
    assert_eq!(
        body(response).await,
        "<!DOCTYPE html><html lang=\"en\"><title>404</title><p>Not Found</p>"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_router_miss_continues_to_later_groups() {
    init_tracing();

    let dispatcher = Dispatcher::builder()
        .get("/users/:id", user)
        .middleware("/users/**", h2)
        .build()
        .unwrap();

    let response = dispatcher.serve(request(Method::POST, "/users/1")).await;
    assert_eq!(body(response).await, "h2");

    let response = dispatcher.serve(request(Method::GET, "/users/1/posts")).await;
    assert_eq!(body(response).await, "h2");

    let response = dispatcher.serve(request(Method::GET, "/users/1")).await;
    assert_eq!(body(response).await, "id=1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_params_are_captured_in_order() {
    let dispatcher = Dispatcher::builder()
        .get("/blog/:category/:post", user)
        .build()
        .unwrap();

    let response = dispatcher.serve(request(Method::GET, "/blog/rust/request-routers/")).await;
    assert_eq!(body(response).await, "category=rust&post=request-routers");

    let response = dispatcher.serve(request(Method::GET, "/blog/rust/")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_case_insensitive_by_default() {
    let dispatcher = Dispatcher::builder().get("/users/:id", user).build().unwrap();

    let upper = body(dispatcher.serve(request(Method::GET, "/Users/1")).await).await;
    let lower = body(dispatcher.serve(request(Method::GET, "/users/1")).await).await;
    assert_eq!(upper, "id=1");
    assert_eq!(upper, lower);

    let dispatcher = Dispatcher::builder()
        .case_sensitive(true)
        .get("/users/:id", user)
        .build()
        .unwrap();

    let response = dispatcher.serve(request(Method::GET, "/Users/1")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_any_routes() {
    let dispatcher = Dispatcher::builder()
        .post("/items", h1)
        .any("/items", method_name)
        .build()
        .unwrap();

    let response = dispatcher.serve(request(Method::POST, "/items")).await;
    assert_eq!(body(response).await, "h1");

    for method in &[Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
        let response = dispatcher.serve(request(method.clone(), "/items")).await;
        assert_eq!(body(response).await, method.as_str());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_all_registers_common_methods() {
    let dispatcher = Dispatcher::builder().all("/echo", method_name).build().unwrap();

    for method in &[Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
        let response = dispatcher.serve(request(method.clone(), "/echo")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = dispatcher.serve(request(Method::PATCH, "/echo")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_handler_error_aborts_dispatch() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));

    let dispatcher = Dispatcher::builder()
        .get("/fail", failing)
        .middleware("**", Counter(calls.clone()))
        .build()
        .unwrap();

    let mut req = request(Method::GET, "/fail");
    let err = dispatcher.dispatch(&mut req).await.unwrap_err();
    assert!(matches!(err, DispatchError::Handler { ref path, .. } if path == "/fail"));
    assert_eq!(
        err.to_string(),
        "handler failed for '/fail': database is down"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let response = dispatcher.serve(request(Method::GET, "/fail")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    dispatcher.serve(request(Method::GET, "/other")).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_double_send_is_an_error() {
    let dispatcher = Dispatcher::builder().get("/twice", double_send).build().unwrap();

    let mut req = request(Method::GET, "/twice");
    let err = dispatcher.dispatch(&mut req).await.unwrap_err();

    match err {
        DispatchError::Handler { source, .. } => {
            let source = source.downcast::<ReplyError>().unwrap();
            assert!(matches!(*source, ReplyError::AlreadySent));
        }
        err => panic!("unexpected error: {}", err),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_static_groups() {
    let dir = public_dir();
    let options = StaticOptions {
        forbid_directories: true,
        max_age: Some(Duration::from_secs(3600)),
        ..StaticOptions::default()
    };
    let public = Arc::new(StaticDir::open(dir.path(), options).unwrap());

    let dispatcher = Dispatcher::builder()
        .serve_static(public.clone())
        .any("/a.txt", method_name)
        .build()
        .unwrap();

    let response = dispatcher.serve(request(Method::GET, "/assets")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body(response).await,
        "<!DOCTYPE html><html lang=\"en\"><title>403</title><p>Forbidden</p>"
    );

    let response = dispatcher.serve(request(Method::GET, "/assets/")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = dispatcher.serve(request(Method::GET, "/assets/app.js")).await;
    assert_eq!(response.headers()[CACHE_CONTROL], "public, max-age=3600");
    assert_eq!(body(response).await, "console.log(1)");

    // non-GET requests skip static groups
    let response = dispatcher.serve(request(Method::POST, "/a.txt")).await;
    assert_eq!(body(response).await, "POST");

    fs::write(dir.path().join("late.txt"), "late").unwrap();
    let response = dispatcher.serve(request(Method::GET, "/late.txt")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    public.rescan().unwrap();
    let response = dispatcher.serve(request(Method::GET, "/late.txt")).await;
    assert_eq!(body(response).await, "late");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_static_lookup_uses_normalized_path() {
    init_tracing();
    let dir = public_dir();
    fs::write(dir.path().join("README.md"), "readme").unwrap();

    let index = Arc::new(public(&dir));

    let dispatcher = Dispatcher::builder()
        .serve_static(index.clone())
        .build()
        .unwrap();

    let response = dispatcher.serve(request(Method::GET, "/A.TXT")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, "static a");

    // lowercased requests never reach a mixed-case file name
    let response = dispatcher.serve(request(Method::GET, "/README.md")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let dispatcher = Dispatcher::builder()
        .case_sensitive(true)
        .serve_static(index)
        .build()
        .unwrap();

    let response = dispatcher.serve(request(Method::GET, "/README.md")).await;
    assert_eq!(body(response).await, "readme");

    let response = dispatcher.serve(request(Method::GET, "/A.TXT")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

async fn plain_error(
    error: HttpError,
    req: &mut Request<Body>,
    reply: &mut Reply,
) -> Result<(), BoxError> {
    let status = error.status.as_u16();
    let body = format!("{} {} at {}", status, error.message, req.uri().path());
    reply.header(CONTENT_TYPE, "text/plain")?.send(body)?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_error_handler() {
    async fn broken(_: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
        reply.status(StatusCode::INTERNAL_SERVER_ERROR)?.send(())?;
        Ok(())
    }

    async fn teapot(_: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
        reply.status(StatusCode::IM_A_TEAPOT)?.send("short and stout")?;
        Ok(())
    }

    init_tracing();
    let dir = public_dir();
    let options = StaticOptions {
        forbid_directories: true,
        ..StaticOptions::default()
    };

    let dispatcher = Dispatcher::builder()
        .serve_static(StaticDir::open(dir.path(), options).unwrap())
        .get("/broken", broken)
        .get("/teapot", teapot)
        .error(plain_error)
        .build()
        .unwrap();

    let response = dispatcher.serve(request(Method::GET, "/assets")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    assert_eq!(body(response).await, "403 Forbidden at /assets");

    let response = dispatcher.serve(request(Method::GET, "/missing")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(response).await, "404 Not Found at /missing");

    let response = dispatcher.serve(request(Method::GET, "/broken")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(response).await, "500 Internal Server Error at /broken");

    // error replies with a body are left alone
    let response = dispatcher.serve(request(Method::GET, "/teapot")).await;
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body(response).await, "short and stout");

    let response = dispatcher.serve(request(Method::GET, "/a.txt")).await;
    assert_eq!(body(response).await, "static a");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_error_handler_after_empty_not_found() {
    async fn silent(_: &mut Request<Body>, _: &mut Reply) -> Result<(), BoxError> {
        Ok(())
    }

    let dispatcher = Dispatcher::builder()
        .not_found(silent)
        .error(plain_error)
        .build()
        .unwrap();

    let response = dispatcher.serve(request(Method::GET, "/nowhere")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(response).await, "404 Not Found at /nowhere");

    let err = Dispatcher::builder()
        .error(plain_error)
        .error(plain_error)
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::DuplicateErrorHandler));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_vanished_static_file() {
    init_tracing();
    let mut index = HashMap::new();
    let gone = StaticEntry::File("/definitely/not/here.txt".into());
    index.insert("/gone.txt".to_owned(), gone);

    let dispatcher = Dispatcher::builder().serve_static(index).build().unwrap();

    let response = dispatcher.serve(request(Method::GET, "/gone.txt")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_custom_not_found() {
    async fn not_found(req: &mut Request<Body>, reply: &mut Reply) -> Result<(), BoxError> {
        let body = format!("nothing at {}", req.uri().path());
        reply.send(body)?;
        Ok(())
    }

    let dispatcher = Dispatcher::builder()
        .use_all(fallthrough)
        .not_found(not_found)
        .build()
        .unwrap();

    let response = dispatcher.serve(request(Method::GET, "/Missing")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-fallthrough"], "yes");
    assert_eq!(body(response).await, "nothing at /Missing");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_middleware_chain_order() {
    async fn first(_: &mut Request<Body>, reply: &mut Reply) -> Result<Next, BoxError> {
        reply.header("x-order", "first")?;
        Ok(Next::Fallthrough)
    }

    async fn second(_: &mut Request<Body>, reply: &mut Reply) -> Result<Next, BoxError> {
        reply.header("x-order", "second")?.send("second")?;
        Ok(Next::Handled)
    }

    let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(first), Arc::new(second), Arc::new(h2)];
    let dispatcher = Dispatcher::builder()
        .middleware_chain(Method::GET, ["/api/*", "/v1/*"], chain)
        .build()
        .unwrap();

    let response = dispatcher.serve(request(Method::GET, "/v1/users")).await;
    assert_eq!(response.headers()["x-order"], "second");
    assert_eq!(body(response).await, "second");

    let response = dispatcher.serve(request(Method::DELETE, "/api/users")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_into_service() {
    let dispatcher = Dispatcher::builder().get("/", h1).build().unwrap();

    let mut make_service = dispatcher.into_service();
    let mut service = make_service.call(()).await.unwrap();

    let response = service.call(request(Method::GET, "/")).await.unwrap();
    assert_eq!(body(response).await, "h1");

    let response = service.call(request(Method::GET, "/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
