//! Transparent access-token refresh for outgoing requests.
//!
//! Every request goes out with the current access token. When the server
//! answers 401/403 the coordinator exchanges the refresh token for a new
//! access token and replays the request once. Concurrent failures share a
//! single refresh: the first caller performs it, later callers queue behind it
//! and are settled together, in arrival order, with the same outcome.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::credentials::CredentialStore;
use crate::error::AuthflowError;
use crate::transport::{Outcome, Transport};
use crate::types::{AccessToken, ApiRequest, ApiResponse, RefreshResponse};

pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// What to do with a refresh token returned by the refresh endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshTokenPolicy {
    /// Keep using the stored refresh token; ignore any returned one.
    #[default]
    Reuse,
    /// Replace the stored refresh token whenever the server issues a new one.
    Rotate,
}

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub refresh_path: String,
    pub policy: RefreshTokenPolicy,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            policy: RefreshTokenPolicy::default(),
        }
    }
}

/// Why the session was given up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryReason {
    /// A request needed a refresh but no refresh token was stored.
    MissingRefreshToken,
    /// The refresh endpoint rejected the refresh token.
    RefreshRejected(u16),
    /// The refresh call failed for a reason other than rejection.
    RefreshFailed(String),
}

impl fmt::Display for ExpiryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiryReason::MissingRefreshToken => f.write_str("no refresh token stored"),
            ExpiryReason::RefreshRejected(status) => {
                write!(f, "refresh token rejected with HTTP {status}")
            }
            ExpiryReason::RefreshFailed(detail) => write!(f, "refresh failed: {detail}"),
        }
    }
}

/// Notified when the coordinator gives up on the session and clears
/// credentials. Front ends use this to route back to a login prompt.
pub trait SessionObserver: Send + Sync {
    fn on_session_expired(&self, reason: &ExpiryReason);
}

impl<F> SessionObserver for F
where
    F: Fn(&ExpiryReason) + Send + Sync,
{
    fn on_session_expired(&self, reason: &ExpiryReason) {
        self(reason)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_session_expired(&self, _reason: &ExpiryReason) {}
}

/// Outcome handed to every queued caller when a refresh settles.
#[derive(Debug, Clone)]
enum Settled {
    Refreshed(AccessToken),
    Expired,
}

type Waiter = oneshot::Sender<Settled>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    waiters: VecDeque<Waiter>,
    /// Bumped on every terminal expiry.
    generation: u64,
}

impl RefreshState {
    /// Return to idle, handing back the queue in arrival order.
    fn finish(&mut self) -> VecDeque<Waiter> {
        self.refreshing = false;
        std::mem::take(&mut self.waiters)
    }
}

fn settle_all(waiters: VecDeque<Waiter>, outcome: &Settled) {
    for waiter in waiters {
        // A dropped receiver means that caller went away; nothing to deliver.
        let _ = waiter.send(outcome.clone());
    }
}

enum Role {
    Leader,
    Follower(oneshot::Receiver<Settled>),
}

/// Resets the refresh state if the refreshing caller is dropped mid-flight.
/// Queued callers then observe a closed channel.
struct InFlight<'a> {
    state: &'a Mutex<RefreshState>,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, outcome: &Settled) {
        self.settled = true;
        let waiters = lock(self.state).finish();
        debug!(waiters = waiters.len(), "settling queued requests");
        settle_all(waiters, outcome);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let waiters = lock(self.state).finish();
            warn!(
                waiters = waiters.len(),
                "token refresh abandoned before completion"
            );
        }
    }
}

fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    observer: Arc<dyn SessionObserver>,
    settings: RefreshSettings,
    state: Mutex<RefreshState>,
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("settings", &self.settings)
            .field("refreshing", &self.refresh_in_flight())
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<CredentialStore>) -> Self {
        Self {
            transport,
            store,
            observer: Arc::new(NoopObserver),
            settings: RefreshSettings::default(),
            state: Mutex::new(RefreshState::default()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_settings(mut self, settings: RefreshSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn settings(&self) -> &RefreshSettings {
        &self.settings
    }

    /// Whether a refresh call is currently outstanding.
    pub fn refresh_in_flight(&self) -> bool {
        lock(&self.state).refreshing
    }

    /// Number of callers parked behind the outstanding refresh.
    pub fn queued(&self) -> usize {
        lock(&self.state).waiters.len()
    }

    /// Send a request, refreshing the access token and replaying the request
    /// once if the server rejects the current one.
    ///
    /// Fails with [`AuthflowError::AuthenticationExpired`] when the session
    /// cannot be restored; credentials are cleared and the observer notified
    /// before that error is returned. Non-auth failures pass through untouched.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AuthflowError> {
        let mut request = request;
        let generation = lock(&self.state).generation;
        let mut bearer = self.store.access();

        loop {
            let status = match self.transport.execute(&request, bearer.as_ref()).await {
                Outcome::Success(response) => return Ok(response),
                Outcome::OtherFailure(e) => return Err(e),
                Outcome::AuthorizationFailure(status) => status,
            };

            if self.is_refresh_call(&request) {
                self.expire(ExpiryReason::RefreshRejected(status));
                return Err(AuthflowError::AuthenticationExpired);
            }

            if request.is_retry() {
                debug!(path = %request.path, status, "replayed request rejected again");
                return Err(AuthflowError::AuthorizationFailure { status });
            }

            debug!(path = %request.path, status, "access token rejected");
            let current = self.store.access();
            bearer = match current {
                // Another caller already refreshed while this one was in flight.
                Some(token) if bearer.as_ref() != Some(&token) => {
                    debug!(path = %request.path, "replaying with the newer stored token");
                    Some(token)
                }
                _ => Some(self.fresh_access_token(generation).await?),
            };
            request = request.into_retry();
        }
    }

    /// Send a request exactly once with the current access token. Auth
    /// failures are reported as-is and never start a refresh.
    pub async fn send_once(&self, request: ApiRequest) -> Result<ApiResponse, AuthflowError> {
        let bearer = self.store.access();
        match self.transport.execute(&request, bearer.as_ref()).await {
            Outcome::Success(response) => Ok(response),
            Outcome::AuthorizationFailure(status) => {
                Err(AuthflowError::AuthorizationFailure { status })
            }
            Outcome::OtherFailure(e) => Err(e),
        }
    }

    fn is_refresh_call(&self, request: &ApiRequest) -> bool {
        request.path.trim_end_matches('/') == self.settings.refresh_path.trim_end_matches('/')
    }

    /// Join the outstanding refresh or start one.
    ///
    /// `generation` is the expiry generation seen when the caller's request
    /// went out. If the session expired since then and nobody logged in
    /// again, the caller fails without a second refresh or notification.
    async fn fresh_access_token(&self, generation: u64) -> Result<AccessToken, AuthflowError> {
        let role = {
            let mut state = lock(&self.state);
            if state.generation != generation && self.store.refresh().is_none() {
                debug!("session already expired by a concurrent request");
                return Err(AuthflowError::AuthenticationExpired);
            }
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                debug!(position = state.waiters.len(), "queued behind in-flight refresh");
                Role::Follower(rx)
            } else {
                state.refreshing = true;
                Role::Leader
            }
        };

        match role {
            Role::Follower(rx) => match rx.await {
                Ok(Settled::Refreshed(token)) => Ok(token),
                Ok(Settled::Expired) => Err(AuthflowError::AuthenticationExpired),
                Err(_) => Err(AuthflowError::RefreshInterrupted),
            },
            Role::Leader => {
                let in_flight = InFlight {
                    state: &self.state,
                    settled: false,
                };
                let result = self.refresh().await;
                let outcome = match &result {
                    Ok(token) => Settled::Refreshed(token.clone()),
                    Err(_) => Settled::Expired,
                };
                in_flight.settle(&outcome);
                result
            }
        }
    }

    /// Exchange the stored refresh token for a new access token.
    async fn refresh(&self) -> Result<AccessToken, AuthflowError> {
        let Some(refresh_token) = self.store.refresh() else {
            self.expire(ExpiryReason::MissingRefreshToken);
            return Err(AuthflowError::AuthenticationExpired);
        };

        let request = ApiRequest::post(
            self.settings.refresh_path.clone(),
            serde_json::json!({ "refreshToken": refresh_token.as_str() }),
        );

        let reason = match self.transport.execute(&request, None).await {
            Outcome::Success(response) => match response.json::<RefreshResponse>() {
                Ok(body) => {
                    self.store.set_access(body.access_token.clone());
                    if self.settings.policy == RefreshTokenPolicy::Rotate {
                        match body.refresh_token {
                            Some(rotated) => self.store.set_refresh(Some(rotated)),
                            None => debug!("refresh response carried no rotated refresh token"),
                        }
                    }
                    info!("access token refreshed");
                    return Ok(body.access_token);
                }
                Err(e) => ExpiryReason::RefreshFailed(e.to_string()),
            },
            Outcome::AuthorizationFailure(status) => ExpiryReason::RefreshRejected(status),
            Outcome::OtherFailure(e) => ExpiryReason::RefreshFailed(e.to_string()),
        };

        self.expire(reason);
        Err(AuthflowError::AuthenticationExpired)
    }

    fn expire(&self, reason: ExpiryReason) {
        lock(&self.state).generation += 1;
        info!("session expired: {reason}");
        self.store.clear();
        self.observer.on_session_expired(&reason);
    }
}
