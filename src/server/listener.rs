use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::server::handler::{Middleware, SharedHandler, compose};

/// A bound listener plus the composed handler chain.
pub struct Server {
    listener: TcpListener,
    handler: SharedHandler,
    read_timeout: Duration,
}

impl Server {
    /// Binds `cfg.listen_addr()` and wraps `handler` in `middleware`, the
    /// first entry being the outermost layer.
    pub async fn bind(
        cfg: &Config,
        handler: SharedHandler,
        middleware: &[Arc<dyn Middleware>],
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(cfg.listen_addr()).await?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            handler: compose(handler, middleware),
            read_timeout: cfg.read_timeout,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until an accept fails.
    pub async fn run(self) -> anyhow::Result<()> {
        self.serve(std::future::pending()).await
    }

    /// Runs the accept loop on a background task.
    ///
    /// Dropping the returned handle closes the listener as well.
    pub fn spawn(self) -> anyhow::Result<ServerHandle> {
        let addr = self.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();

        let task = tokio::spawn(self.serve(async move {
            let _ = rx.await;
        }));

        Ok(ServerHandle {
            addr,
            shutdown: Some(tx),
            task,
        })
    }

    async fn serve(self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        tokio::pin!(shutdown);

        loop {
            let (socket, peer) = tokio::select! {
                _ = &mut shutdown => {
                    info!("Listener closed");
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted?,
            };
            debug!("Accepted connection from {}", peer);

            let handler = Arc::clone(&self.handler);
            let read_timeout = self.read_timeout;

            tokio::spawn(async move {
                let mut conn = Connection::new(socket, handler, read_timeout);
                if let Err(e) = conn.run().await {
                    warn!("Connection error from {}: {}", peer, e);
                }
            });
        }
    }
}

/// Handle to a server started with [`Server::spawn`].
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops accepting new connections. Connections already being served
    /// run to completion on their own tasks.
    pub async fn close(mut self) -> anyhow::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        (&mut self.task).await?
    }
}
