use crate::defaults;
use crate::progress::{Progress, ProgressObserver};
use crate::service::{ServiceError, VectorService};
use std::time::Duration;

/// Fixed-delay retry policy for the initial handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: defaults::DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_secs(defaults::DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

/// Handshake progress. A successful attempt leaves the machine by returning
/// the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Idle,
    Attempting(u32),
    Exhausted(u32),
}

#[derive(Debug, thiserror::Error)]
#[error("vector service unreachable after {attempts} attempts")]
pub struct ConnectFailure {
    pub attempts: u32,
    #[source]
    pub last: ServiceError,
}

/// Opens a session and confirms it answers a collection listing.
///
/// `open` is called once per attempt so a broken session is never reused.
/// Between failed attempts the task sleeps `policy.retry_delay`; there is no
/// sleep after the final attempt.
pub async fn connect<S, F>(
    mut open: F,
    policy: &RetryPolicy,
    observer: &dyn ProgressObserver,
) -> Result<S, ConnectFailure>
where
    S: VectorService,
    F: FnMut() -> Result<S, ServiceError>,
{
    let total = policy.max_retries.max(1);
    let mut state = ConnectState::Idle;
    let mut last_error = None;

    loop {
        state = match state {
            ConnectState::Idle => ConnectState::Attempting(1),
            ConnectState::Attempting(attempt) => {
                observer.on_progress(&Progress::ConnectAttempt { attempt, total });
                match try_session(&mut open).await {
                    Ok(session) => {
                        observer.on_progress(&Progress::Connected { attempt });
                        return Ok(session);
                    }
                    Err(e) if attempt < total => {
                        observer.on_progress(&Progress::ConnectRetry {
                            attempt,
                            total,
                            error: e.to_string(),
                            delay: policy.retry_delay,
                        });
                        last_error = Some(e);
                        tokio::time::sleep(policy.retry_delay).await;
                        ConnectState::Attempting(attempt + 1)
                    }
                    Err(e) => {
                        last_error = Some(e);
                        ConnectState::Exhausted(attempt)
                    }
                }
            }
            ConnectState::Exhausted(attempts) => {
                observer.on_progress(&Progress::ConnectExhausted { attempts });
                return Err(ConnectFailure {
                    attempts,
                    last: last_error
                        .unwrap_or_else(|| ServiceError::Transport("no attempt was made".into())),
                });
            }
        };
    }
}

async fn try_session<S, F>(open: &mut F) -> Result<S, ServiceError>
where
    S: VectorService,
    F: FnMut() -> Result<S, ServiceError>,
{
    let session = open()?;
    let existing = session.list_collections().await?;
    tracing::debug!("Service reports {} existing collections", existing.len());
    Ok(session)
}
