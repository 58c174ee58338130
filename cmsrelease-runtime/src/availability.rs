//! Availability confirmation for freshly cloned environments.
//!
//! A clone is queryable some unknown time after the request returns. The
//! loop below probes it with a minimal read until one succeeds, backing off
//! between attempts, and stops deterministically on attempt exhaustion, on
//! the overall timeout, or when the shutdown channel fires.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::time::{sleep, sleep_until, Instant};

use cmsrelease_core::PollPolicy;
use cmsrelease_gateway::{BackendGateway, ClonedEnvironment};

use crate::error::PromoteError;

/// Polling state. `attempts` counts completed probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ProbeState {
    /// About to issue probe number `attempt` (1-based).
    Probing { attempt: u32 },
    Ready { attempts: u32 },
    /// `max_attempts` probes failed or the overall timeout elapsed.
    TimedOut { attempts: u32 },
    Cancelled { attempts: u32 },
}

impl ProbeState {
    pub fn start() -> Self {
        ProbeState::Probing { attempt: 1 }
    }

    /// Transition after a probe; terminal states never change.
    pub fn advance(self, probe_succeeded: bool, max_attempts: u32) -> Self {
        match self {
            ProbeState::Probing { attempt } if probe_succeeded => {
                ProbeState::Ready { attempts: attempt }
            }
            ProbeState::Probing { attempt } if attempt >= max_attempts => {
                ProbeState::TimedOut { attempts: attempt }
            }
            ProbeState::Probing { attempt } => ProbeState::Probing {
                attempt: attempt + 1,
            },
            terminal => terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ProbeState::Probing { .. })
    }

    pub fn is_ready(self) -> bool {
        matches!(self, ProbeState::Ready { .. })
    }

    /// Completed probes so far.
    pub fn attempts(self) -> u32 {
        match self {
            ProbeState::Probing { attempt } => attempt.saturating_sub(1),
            ProbeState::Ready { attempts }
            | ProbeState::TimedOut { attempts }
            | ProbeState::Cancelled { attempts } => attempts,
        }
    }
}

impl fmt::Display for ProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeState::Probing { attempt } => write!(f, "probing (attempt {attempt})"),
            ProbeState::Ready { attempts } => write!(f, "ready after {attempts} probe(s)"),
            ProbeState::TimedOut { attempts } => {
                write!(f, "still unavailable after {attempts} probe(s)")
            }
            ProbeState::Cancelled { attempts } => {
                write!(f, "cancelled after {attempts} probe(s)")
            }
        }
    }
}

/// Probe `cloned` until it is queryable or polling has to stop.
///
/// Probes run on the blocking pool; at most one is in flight. Returns a
/// terminal [`ProbeState`].
pub async fn await_availability<G>(
    gateway: Arc<G>,
    cloned: &ClonedEnvironment,
    policy: &PollPolicy,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<ProbeState, PromoteError>
where
    G: BackendGateway + ?Sized + 'static,
{
    let deadline = policy.timeout.map(|timeout| Instant::now() + timeout);
    let environment = cloned.id().clone();
    let mut state = ProbeState::start();

    while let ProbeState::Probing { attempt } = state {
        if shutdown_requested(&mut shutdown) {
            tracing::warn!(environment = %environment, "availability check cancelled");
            return Ok(ProbeState::Cancelled { attempts: state.attempts() });
        }
        let probe = {
            let gateway = Arc::clone(&gateway);
            let cloned = cloned.clone();
            tokio::task::spawn_blocking(move || gateway.probe_environment(&cloned))
        };

        let result = tokio::select! {
            biased;
            _ = shutdown_signal(&mut shutdown) => {
                tracing::warn!(environment = %environment, "availability check cancelled");
                return Ok(ProbeState::Cancelled { attempts: state.attempts() });
            }
            _ = until(deadline) => {
                tracing::warn!(environment = %environment, "availability check timed out");
                return Ok(ProbeState::TimedOut { attempts: state.attempts() });
            }
            joined = probe => joined
                .map_err(|err| PromoteError::Join(format!("availability probe: {err}")))?,
        };

        match &result {
            Ok(()) => tracing::info!(
                environment = %environment,
                attempts = attempt,
                "environment is available"
            ),
            Err(err) => tracing::debug!(
                environment = %environment,
                attempt,
                error = %err,
                "environment still provisioning"
            ),
        }
        state = state.advance(result.is_ok(), policy.max_attempts);

        if state.is_terminal() {
            break;
        }

        tokio::select! {
            biased;
            _ = shutdown_signal(&mut shutdown) => {
                tracing::warn!(environment = %environment, "availability check cancelled");
                return Ok(ProbeState::Cancelled { attempts: state.attempts() });
            }
            _ = until(deadline) => {
                tracing::warn!(environment = %environment, "availability check timed out");
                return Ok(ProbeState::TimedOut { attempts: state.attempts() });
            }
            _ = sleep(policy.delay_after(attempt)) => {}
        }
    }

    if let ProbeState::TimedOut { attempts } = state {
        tracing::warn!(
            environment = %environment,
            attempts,
            "environment did not become available"
        );
    }
    Ok(state)
}

fn shutdown_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    matches!(shutdown.try_recv(), Ok(()) | Err(TryRecvError::Lagged(_)))
}

/// Resolves when shutdown is requested; never, once every sender is gone.
async fn shutdown_signal(shutdown: &mut broadcast::Receiver<()>) {
    match shutdown.recv().await {
        Ok(()) | Err(RecvError::Lagged(_)) => {}
        Err(RecvError::Closed) => std::future::pending::<()>().await,
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
