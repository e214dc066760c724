use async_trait::async_trait;
use common::configuration::Configuration;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::{watch, Notify};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{Instruments, Worker, WorkerError, WorkerKind};
use crate::db::postgresql::PostgreSQLDatabase;
use crate::handlers::service::RequestHandler;
use crate::models::dummy::DummyWorkload;

const LISTEN_BACKLOG: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerMode {
    /// The only listener on the address.
    Exclusive,
    /// One of several worker processes bound to the same address with
    /// `SO_REUSEPORT`. The worker exits after `limit_request` requests.
    Shared,
}

pub struct HttpWorker {
    config: Arc<Configuration>,
    mode: ListenerMode,
}

impl HttpWorker {
    pub fn new(config: Arc<Configuration>, mode: ListenerMode) -> Self {
        Self { config, mode }
    }

    fn limit_request(&self) -> Option<u64> {
        match self.mode {
            ListenerMode::Shared => Some(self.config.server.limit_request),
            ListenerMode::Exclusive => None,
        }
    }

    async fn bind(&self) -> io::Result<TcpListener> {
        let addr: SocketAddr = self
            .config
            .server
            .bind_address
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        #[cfg(unix)]
        if self.mode == ListenerMode::Shared {
            socket.set_reuseport(true)?;
        }
        socket.bind(addr)?;
        socket.listen(LISTEN_BACKLOG)
    }
}

/// Accepts connections until Ctrl-C or until `limit` requests were handled.
/// Open connections are then shut down gracefully: requests already being
/// served complete before this returns.
pub async fn serve(
    listener: TcpListener,
    handler: Arc<RequestHandler>,
    limit: Option<u64>,
) -> Result<(), WorkerError> {
    let limit_reached = Arc::new(Notify::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut connections = JoinSet::new();

    loop {
        let (stream, peer_addr) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = limit_reached.notified() => {
                info!(served = handler.served(), "request limit reached, exiting");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received interrupt, exiting");
                break;
            }
        };
        while connections.try_join_next().is_some() {}
        let io = TokioIo::new(stream);

        let handler = Arc::clone(&handler);
        let limit_reached = Arc::clone(&limit_reached);
        let service = service_fn(move |req| {
            let handler = Arc::clone(&handler);
            let limit_reached = Arc::clone(&limit_reached);
            async move {
                let response = handler.handle(req).await;
                if limit.is_some_and(|limit| handler.served() >= limit) {
                    limit_reached.notify_one();
                }
                Ok::<_, hyper::Error>(response)
            }
        });

        let mut shutdown = shutdown_rx.clone();
        connections.spawn(async move {
            debug!(peer = ?peer_addr, "accepted connection");
            let conn = http1::Builder::new().serve_connection(io, service);
            tokio::pin!(conn);
            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = shutdown.changed() => {
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            };
            if let Err(err) = result {
                warn!(error = ?err, "error serving connection");
            }
        });
    }

    drop(listener);
    let _ = shutdown_tx.send(true);
    if !connections.is_empty() {
        info!(connections = connections.len(), "draining open connections");
    }
    while connections.join_next().await.is_some() {}
    Ok(())
}

#[async_trait]
impl Worker for HttpWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Http
    }

    async fn run(&self, instruments: Instruments) -> Result<(), WorkerError> {
        let database = &self.config.database;
        let db = PostgreSQLDatabase::connect(
            &database.connection_string,
            database.name.clone().unwrap_or_else(|| "-".to_string()),
            instruments.instrumentation.postgres,
        )
        .await?;

        let handler = Arc::new(RequestHandler::new(
            DummyWorkload::new(Arc::new(db)),
            instruments.http_metrics,
            instruments.instrumentation.http,
        ));

        let listener = self.bind().await?;
        info!(
            address = %self.config.server.bind_address,
            pid = std::process::id(),
            "HTTP worker listening"
        );
        serve(listener, handler, self.limit_request()).await
    }
}
