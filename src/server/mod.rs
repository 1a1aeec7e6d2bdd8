//! Listener, handler contracts and built-in middleware.

pub mod handler;
pub mod listener;
pub mod middleware;

pub use handler::{
    BoxFuture, Handler, Middleware, SharedHandler, compose, handler_fn, middleware_fn,
};
pub use listener::{Server, ServerHandle};
pub use middleware::RequestLogger;
