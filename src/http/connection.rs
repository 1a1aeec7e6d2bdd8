use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::http::reader::{RequestError, RequestReader};
use crate::http::request::Request;
use crate::http::response::{StatusCode, default_headers};
use crate::http::writer::{BoxedSink, ResponseWriter};
use crate::server::handler::SharedHandler;

/// Type-erased read half of a connection.
pub type BoxedSource = Box<dyn AsyncRead + Send + Unpin>;

pub struct Connection {
    reader: RequestReader<BoxedSource>,
    sink: Option<BoxedSink>,
    handler: SharedHandler,
    read_timeout: Duration,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Handling(Request),
    Closed,
}

impl Connection {
    pub fn new<S>(stream: S, handler: SharedHandler, read_timeout: Duration) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (source, sink) = tokio::io::split(stream);
        Self {
            reader: RequestReader::new(Box::new(source)),
            sink: Some(Box::new(sink)),
            handler,
            read_timeout,
            state: ConnectionState::Reading,
        }
    }

    /// Serves requests one at a time until the peer asks to close, sends
    /// something unparsable, idles past the read timeout, or goes away.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match self.reader.read_request(self.read_timeout).await {
                        Ok(request) => ConnectionState::Handling(request),
                        Err(RequestError::ConnectionClosed) => ConnectionState::Closed,
                        Err(e) if e.is_client_error() => {
                            tracing::debug!(error = %e, "rejecting request");
                            self.reject().await;
                            ConnectionState::Closed
                        }
                        Err(e) => return Err(e.into()),
                    };
                }

                ConnectionState::Handling(request) => {
                    let keep_alive = request.keep_alive();
                    self.handle(&request).await?;

                    if keep_alive {
                        self.state = ConnectionState::Reading; // go back for next request
                    }
                }

                ConnectionState::Closed => break,
            }
        }

        if let Some(sink) = self.sink.as_mut() {
            let _ = sink.shutdown().await;
        }

        Ok(())
    }

    async fn handle(&mut self, request: &Request) -> anyhow::Result<()> {
        let sink = self
            .sink
            .take()
            .ok_or_else(|| anyhow::anyhow!("response sink already taken"))?;

        let mut writer = ResponseWriter::new(sink);
        self.handler.call(&mut writer, request).await;
        let result = writer.finish().await;

        self.sink = Some(writer.into_inner());
        result?;
        Ok(())
    }

    /// Best-effort `400 Bad Request` with an empty body.
    async fn reject(&mut self) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        let mut writer = ResponseWriter::new(sink);
        let headers = default_headers(0, "text/plain", false);
        writer.write(StatusCode::BadRequest, &headers, &[]).await;
        let _ = writer.finish().await;
    }
}
