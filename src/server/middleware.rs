use std::sync::Arc;
use std::time::Instant;

use crate::http::request::Request;
use crate::http::writer::ResponseWriter;
use crate::server::handler::{BoxFuture, Handler, Middleware, SharedHandler};

/// Logs `method target` for every request, and the handling time once the
/// inner handler returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

impl Middleware for RequestLogger {
    fn wrap(&self, next: SharedHandler) -> SharedHandler {
        Arc::new(Logged { next })
    }
}

struct Logged {
    next: SharedHandler,
}

impl Handler for Logged {
    fn call<'a>(&'a self, writer: &'a mut ResponseWriter, request: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            let started = Instant::now();
            tracing::info!(method = %request.method, target = %request.target, "request");

            self.next.call(writer, request).await;

            tracing::debug!(
                method = %request.method,
                target = %request.target,
                elapsed_us = started.elapsed().as_micros() as u64,
                "request handled"
            );
        })
    }
}
