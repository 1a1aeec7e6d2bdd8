//! Handler and middleware contracts.
//!
//! A [`Handler`] receives the connection's [`ResponseWriter`] and the parsed
//! [`Request`] and produces its response purely through writer calls. A
//! [`Middleware`] wraps one handler into another. The composed chain is
//! built once when the server starts and shared read-only by every
//! connection task.

use std::pin::Pin;
use std::sync::Arc;

use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, writer: &'a mut ResponseWriter, request: &'a Request) -> BoxFuture<'a>;
}

pub type SharedHandler = Arc<dyn Handler>;

pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: SharedHandler) -> SharedHandler;
}

impl<F> Middleware for F
where
    F: Fn(SharedHandler) -> SharedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: SharedHandler) -> SharedHandler {
        self(next)
    }
}

/// Wraps `handler` so that `middleware[0]` is the outermost layer: it sees
/// the request first and the response last.
pub fn compose(handler: SharedHandler, middleware: &[Arc<dyn Middleware>]) -> SharedHandler {
    middleware
        .iter()
        .rev()
        .fold(handler, |next, layer| layer.wrap(next))
}

/// Boxes a closure as a [`Middleware`], pinning down its argument type so
/// `|next| ...` needs no annotation.
pub fn middleware_fn<F>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(SharedHandler) -> SharedHandler + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Adapter turning a closure into a [`Handler`].
///
/// ```
/// # use tidewire::http::response::{default_headers, StatusCode};
/// # use tidewire::server::handler::handler_fn;
/// let hello = handler_fn(|w, _req| {
///     Box::pin(async move {
///         let body = b"hello";
///         let headers = default_headers(body.len(), "text/plain", true);
///         w.write(StatusCode::Ok, &headers, body).await;
///     })
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut ResponseWriter, &'a Request) -> BoxFuture<'a> + Send + Sync + 'static,
{
    HandlerFn(f)
}

pub struct HandlerFn<F>(F);

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut ResponseWriter, &'a Request) -> BoxFuture<'a> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, writer: &'a mut ResponseWriter, request: &'a Request) -> BoxFuture<'a> {
        (self.0)(writer, request)
    }
}
