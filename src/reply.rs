//! The response under construction for a single request.

use crate::error::ReplyError;

use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Body, Response, StatusCode};
use std::convert::TryFrom;
use std::io;
use std::path::PathBuf;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

const HTML_UTF_8: &str = "text/html; charset=utf-8";

/// Body of a [`Reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    Empty,
    Bytes(Bytes),
    /// A file on disk, streamed when the reply is turned into a response.
    File(PathBuf),
}

/// The response a handler completes.
///
/// A reply is shared by every handler that sees the request: middleware that
/// falls through may still set headers for whoever handles the request later.
/// Once [`send`](Reply::send) was called the reply is frozen, and any further
/// mutation fails with [`ReplyError::AlreadySent`].
#[derive(Debug)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: ReplyBody,
    sent: bool,
    // set when the dispatcher itself produced the error status
    status_page: bool,
}

impl Reply {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: ReplyBody::Empty,
            sent: false,
            status_page: false,
        }
    }

    /// Sets the status code.
    pub fn status(&mut self, status: StatusCode) -> Result<&mut Self, ReplyError> {
        self.ensure_open()?;
        self.status = status;
        Ok(self)
    }

    /// Sets a header, replacing any previous value.
    pub fn header<K, V>(&mut self, name: K, value: V) -> Result<&mut Self, ReplyError>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<hyper::http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<hyper::http::Error>,
    {
        self.ensure_open()?;
        let name = HeaderName::try_from(name).map_err(Into::<hyper::http::Error>::into)?;
        let value = HeaderValue::try_from(value).map_err(Into::<hyper::http::Error>::into)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Attaches the body and marks the reply as sent.
    pub fn send(&mut self, body: impl Into<ReplyBody>) -> Result<(), ReplyError> {
        self.ensure_open()?;
        self.body = body.into();
        self.sent = true;
        Ok(())
    }

    /// Sends the file at `path` as the body.
    pub fn send_file(&mut self, path: impl Into<PathBuf>) -> Result<(), ReplyError> {
        self.send(ReplyBody::File(path.into()))
    }

    /// Returns true once the reply was sent.
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &ReplyBody {
        &self.body
    }

    /// Sends `status` without a body. Unless an error handler fills it in, the
    /// built-in HTML page for `status` becomes the body.
    pub(crate) fn send_status(&mut self, status: StatusCode) -> Result<(), ReplyError> {
        self.status(status)?;
        self.send(ReplyBody::Empty)?;
        self.status_page = true;
        Ok(())
    }

    /// Returns true if the status is `4xx` or `5xx` and no body was sent.
    pub(crate) fn is_bodiless_error(&self) -> bool {
        (self.status.is_client_error() || self.status.is_server_error())
            && self.body == ReplyBody::Empty
    }

    /// Reopens a sent reply so an error handler can complete it.
    pub(crate) fn reopen(&mut self) {
        self.sent = false;
    }

    /// Freezes the reply. A pending status page is rendered if the body is
    /// still empty.
    pub(crate) fn finish(&mut self) {
        if self.status_page && self.body == ReplyBody::Empty {
            self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTML_UTF_8));
            self.body = status_page(self.status).into();
        }
        self.sent = true;
    }

    /// Converts the reply into a hyper response. File bodies are streamed from
    /// disk.
    pub async fn into_response(self) -> io::Result<Response<Body>> {
        let Reply { status, mut headers, body, .. } = self;

        let body = match body {
            ReplyBody::Empty => Body::empty(),
            ReplyBody::Bytes(bytes) => Body::from(bytes),
            ReplyBody::File(path) => {
                let file = File::open(&path).await?;
                let len = file.metadata().await?.len();

                if !headers.contains_key(CONTENT_TYPE) {
                    let mime = mime_guess::from_path(&path).first_or_octet_stream();
                    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
                        headers.insert(CONTENT_TYPE, value);
                    }
                }
                headers.insert(CONTENT_LENGTH, HeaderValue::from(len));

                Body::wrap_stream(ReaderStream::new(file))
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

impl Default for Reply {
    fn default() -> Self {
        Self::new()
    }
}

impl Reply {
    fn ensure_open(&self) -> Result<(), ReplyError> {
        if self.sent {
            Err(ReplyError::AlreadySent)
        } else {
            Ok(())
        }
    }
}

/// A standalone HTML response for `status`, used when no reply exists.
pub(crate) fn status_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::from(status_page(status)));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(HTML_UTF_8));
    response
}

fn status_page(status: StatusCode) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><title>{}</title><p>{}</p>",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    )
}

impl From<()> for ReplyBody {
    fn from(_: ()) -> Self {
        ReplyBody::Empty
    }
}

impl From<&'static str> for ReplyBody {
    fn from(value: &'static str) -> Self {
        if value.is_empty() {
            ReplyBody::Empty
        } else {
            ReplyBody::Bytes(Bytes::from_static(value.as_bytes()))
        }
    }
}

impl From<String> for ReplyBody {
    fn from(value: String) -> Self {
        ReplyBody::Bytes(Bytes::from(value))
    }
}

impl From<Vec<u8>> for ReplyBody {
    fn from(value: Vec<u8>) -> Self {
        ReplyBody::Bytes(Bytes::from(value))
    }
}

impl From<Bytes> for ReplyBody {
    fn from(value: Bytes) -> Self {
        ReplyBody::Bytes(value)
    }
}
