//! Daemon entry point for quay.
//!
//! Loads configuration from the environment, connects the terminal database,
//! then serves the chat endpoint over HTTP and/or the MCP protocol over stdio.
//! Logs go to stderr so stdout stays reserved for MCP frames.

mod config;
mod runtime;

use std::sync::Arc;

use anyhow::Context;
use quay_core::catalog;
use quay_core::tools::ToolExecutor;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::QuayConfig;

const DEFAULT_LOG_FILTER: &str =
    "quayd=info,quay_core=info,quay_chat=info,quay_mcp=info,tower_http=info";

type TaskOutcome = (&'static str, anyhow::Result<()>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = QuayConfig::from_args().context("invalid configuration")?;
    catalog::verify().context("tool catalog is inconsistent")?;

    let store = runtime::connect_store(&config)
        .await
        .context("failed to initialize the terminal database")?;
    info!(provider = %config.provider, "database connected");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();

    if let Some(settings) = &config.model {
        let server = runtime::build_chat_server(&config, settings, store.clone())
            .context("failed to configure the model client")?;
        let mut stop = shutdown_rx.clone();
        tasks.spawn(async move {
            let shutdown = async move {
                let _ = stop.wait_for(|stop| *stop).await;
            };
            let result = server.serve(shutdown).await.map_err(|err| anyhow::anyhow!(err));
            ("chat server", result)
        });
    }

    if config.mcp_stdio {
        let executor = Arc::new(ToolExecutor::new(store.clone()));
        let mut stop = shutdown_rx.clone();
        tasks.spawn(async move {
            tokio::select! {
                result = quay_mcp::server::serve_stdio(executor) => {
                    ("mcp stdio", result.map_err(|err| anyhow::anyhow!(err)))
                }
                _ = stop.wait_for(|stop| *stop) => ("mcp stdio", Ok(())),
            }
        });
    }

    let mut failure = supervise(&mut tasks, shutdown_signal()).await;

    let _ = shutdown_tx.send(true);
    while let Some(joined) = tasks.join_next().await {
        if let Some(err) = task_failure(joined) {
            failure.get_or_insert(err);
        }
    }

    store.close().await;
    info!("shutdown complete");
    failure.map_or(Ok(()), Err)
}

/// Waits for `shutdown`, a failed task, or every task to stop. A task that
/// stops cleanly leaves the others running.
async fn supervise(
    tasks: &mut JoinSet<TaskOutcome>,
    shutdown: impl Future<Output = ()>,
) -> Option<anyhow::Error> {
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => return None,
            joined = tasks.join_next() => match joined {
                Some(joined) => {
                    if let Some(err) = task_failure(joined) {
                        return Some(err);
                    }
                }
                None => return None,
            },
        }
    }
}

fn task_failure(joined: Result<TaskOutcome, JoinError>) -> Option<anyhow::Error> {
    match joined {
        Ok((task, Ok(()))) => {
            info!(task, "stopped");
            None
        }
        Ok((task, Err(err))) => {
            error!(task, error = %err, "stopped with an error");
            Some(err.context(format!("{task} failed")))
        }
        Err(err) => {
            error!(error = %err, "server task panicked or was cancelled");
            Some(anyhow::Error::from(err))
        }
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use std::future::pending;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn clean_stdio_exit_keeps_chat_running() {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        tasks.spawn(async { ("mcp stdio", Ok(())) });
        tasks.spawn(async move {
            let _ = stop_rx.wait_for(|stop| *stop).await;
            ("chat server", Ok(()))
        });

        let waited =
            tokio::time::timeout(Duration::from_millis(100), supervise(&mut tasks, pending())).await;
        assert!(waited.is_err(), "supervisor returned while chat was still serving");
        assert_eq!(tasks.len(), 1);

        let _ = stop_tx.send(true);
        assert!(supervise(&mut tasks, pending()).await.is_none());
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn failed_task_stops_supervision() {
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        tasks.spawn(async { ("mcp stdio", Err(anyhow::anyhow!("broken pipe"))) });
        tasks.spawn(async {
            pending::<()>().await;
            ("chat server", Ok(()))
        });

        let err = supervise(&mut tasks, pending()).await.expect("failure");
        assert_eq!(err.to_string(), "mcp stdio failed");
        assert_eq!(tasks.len(), 1);
        tasks.abort_all();
    }

    #[tokio::test]
    async fn shutdown_signal_ends_supervision() {
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
        tasks.spawn(async {
            pending::<()>().await;
            ("chat server", Ok(()))
        });

        assert!(supervise(&mut tasks, async {}).await.is_none());
        tasks.abort_all();
    }
}
