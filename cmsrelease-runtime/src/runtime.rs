use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use cmsrelease_gateway::BackendGateway;

use crate::error::PromoteError;

/// Blocking tasks still running at the end (an in-flight probe after
/// cancellation) get this long before the runtime is torn down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Build a runtime, wire ctrl-c to a shutdown channel, and block the current
/// thread on `task(shutdown_rx)`.
pub fn block_on_with_shutdown<T, F, Fut>(task: F) -> Result<T, PromoteError>
where
    F: FnOnce(broadcast::Receiver<()>) -> Fut,
    Fut: Future<Output = Result<T, PromoteError>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(PromoteError::Runtime)?;

    let result = runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(4);

        let signal_handle = {
            let shutdown = shutdown_tx.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("received ctrl-c, cancelling");
                        let _ = shutdown.send(());
                    }
                    Err(err) => tracing::warn!(error = %err, "ctrl-c handler failed"),
                }
            })
        };

        let result = task(shutdown_rx).await;
        signal_handle.abort();
        drop(shutdown_tx);
        result
    });

    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

/// Run a gateway call on the blocking pool.
pub(crate) async fn blocking<G, T, F>(
    gateway: &Arc<G>,
    what: &'static str,
    call: F,
) -> Result<T, PromoteError>
where
    G: BackendGateway + ?Sized + 'static,
    T: Send + 'static,
    F: FnOnce(&G) -> T + Send + 'static,
{
    let gateway = Arc::clone(gateway);
    tokio::task::spawn_blocking(move || call(&*gateway))
        .await
        .map_err(|err| PromoteError::Join(format!("{what}: {err}")))
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `verbosity` picks the level:
/// negative is `warn`, 0 `info`, 1 `debug`, 2 and above `trace`.
pub fn init_tracing(verbosity: i8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match verbosity {
        i8::MIN..=-1 => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
