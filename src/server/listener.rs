use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::http::connection::Connection;
use crate::server::Handler;

/// Accepts connections and hands each one to its own task.
///
/// Cloning yields another handle to the same server; [`close`](Self::close)
/// on any handle stops the accept loop.
#[derive(Clone)]
pub struct Server {
    addr: String,
    handler: Arc<dyn Handler>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Server {
    pub fn new(addr: impl Into<String>, handler: impl Handler) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            addr: addr.into(),
            handler: Arc::new(handler),
            shutdown: Arc::new(shutdown),
        }
    }

    /// Binds the configured address, installs the signal watcher and runs
    /// the accept loop until shutdown.
    pub async fn serve(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        info!("Listening on {}", self.addr);

        tokio::spawn(self.clone().watch_shutdown_signals());

        self.serve_listener(listener).await
    }

    /// Runs the accept loop on an already bound listener.
    ///
    /// Once shutdown is requested the listener is dropped, and so closed,
    /// and this waits for connections already accepted to finish before
    /// returning.
    pub async fn serve_listener(&self, listener: TcpListener) -> anyhow::Result<()> {
        let mut shutdown = self.shutdown.subscribe();
        let mut connections = JoinSet::new();

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                biased;

                _ = shutdown.changed() => continue,

                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Connection task failed");
                    }
                }

                accepted = listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        info!("Accepted connection from {}", peer);

                        let handler = Arc::clone(&self.handler);
                        connections.spawn(async move {
                            let conn = Connection::new(socket, peer, handler);
                            if let Err(e) = conn.run().await {
                                error!("Connection error from {}: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => {
                        if self.is_closed() {
                            break;
                        }
                        warn!(error = %e, "Failed to accept connection");
                    }
                },
            }
        }

        drop(listener);
        info!("Listener closed");

        if !connections.is_empty() {
            info!(in_flight = connections.len(), "Waiting for open connections");
        }
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Connection task failed");
            }
        }

        Ok(())
    }

    /// Requests shutdown. Safe to call any number of times.
    pub fn close(&self) {
        if !self.shutdown.send_replace(true) {
            info!("Shutting down...");
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn watch_shutdown_signals(self) {
        let mut closed = self.shutdown.subscribe();

        tokio::select! {
            _ = shutdown_signal() => {
                info!("Shutdown signal received");
                self.close();
            }
            _ = closed.wait_for(|closed| *closed) => {}
        }
    }
}

/// Passes through once a signal listener fires. A listener that could not
/// be installed never fires.
async fn signal_received(outcome: std::io::Result<()>, signal: &str) {
    if let Err(e) = outcome {
        warn!(error = %e, "Cannot listen for {}", signal);
        std::future::pending::<()>().await;
    }
}

async fn ctrl_c() {
    signal_received(tokio::signal::ctrl_c().await, "Ctrl-C").await
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => signal_received(Err(e), "SIGTERM").await,
        }
    };

    tokio::select! {
        _ = ctrl_c() => {}
        _ = terminate => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    ctrl_c().await
}
