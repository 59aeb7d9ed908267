use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{Instrument, info};

use crate::config::Config;
use crate::http::connection::{Connection, ServerContext};

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    cfg.validate()?;
    let ctx = Arc::new(ServerContext::from_config(cfg)?);

    let listener = TcpListener::bind(&cfg.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.listen_addr))?;
    info!(
        "Listening on {}, serving {}",
        listener.local_addr()?,
        ctx.resolver.doc_root().display()
    );

    serve(listener, ctx).await
}

/// Accepts connections forever, each handled by its own task.
pub async fn serve(listener: TcpListener, ctx: Arc<ServerContext>) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let ctx = ctx.clone();
        let span = tracing::info_span!("conn", %peer);
        tokio::spawn(
            async move {
                let mut conn = Connection::new(socket, ctx);
                if let Err(e) = conn.run().await {
                    tracing::error!("Connection error from {}: {:#}", peer, e);
                }
                tracing::debug!("connection closed");
            }
            .instrument(span),
        );
    }
}
