//! Analysis session lifecycle.
//!
//! One session per application. Each `analyze` call snapshots the buffer,
//! bumps the generation counter and dispatches a request. When a request
//! completes, its outcome is applied only if its generation is still the
//! current one; outcomes of superseded requests are dropped without
//! touching status, error or results.
//!
//! ```text
//! Idle ──analyze──> InFlight ──ok──> Succeeded ──dismiss──> Idle
//!                      │  ^  └─err─> Failed    ──dismiss──> Idle
//!                      └──┘ analyze (supersedes)
//! ```
//!
//! A failure never clears results: the previous model still describes the
//! last snapshot that was analyzed successfully.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::buffer::CodeBuffer;
use crate::client::{AnalysisRequest, Transport, TransportError};
use crate::result::{self, AnalysisResponse, MalformedResponse, ResultModel};

/// Where the session is in its request cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed {
        error: String,
    },
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::InFlight => "in_flight",
            Status::Succeeded => "succeeded",
            Status::Failed { .. } => "failed",
        }
    }

    /// Error message, present only in the failed state.
    pub fn last_error(&self) -> Option<&str> {
        match self {
            Status::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Status::InFlight)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Succeeded | Status::Failed { .. })
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why an analysis cycle failed. Its message becomes the session error.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed response: {0}")]
    Malformed(#[from] MalformedResponse),
    #[error("analysis task aborted: {0}")]
    Aborted(String),
}

/// A request that has been started but not yet settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub generation: u64,
    pub request: AnalysisRequest,
}

/// What happened to a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The outcome was applied and the session moved to this status.
    Applied(Status),
    /// The outcome belonged to a stale or already settled generation and
    /// was dropped.
    Superseded { generation: u64, current: u64 },
}

impl Completion {
    pub fn is_applied(&self) -> bool {
        matches!(self, Completion::Applied(_))
    }
}

/// Consistent view of the session taken under a single lock.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub status: Status,
    pub generation: u64,
    pub results: Arc<ResultModel>,
}

/// The synchronous state machine behind [`AnalysisSession`].
#[derive(Debug, Default)]
pub struct SessionState {
    status: Status,
    generation: u64,
    results: Arc<ResultModel>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new cycle from any state, superseding one in flight.
    pub fn begin(&mut self, buffer: &CodeBuffer) -> Dispatch {
        self.generation += 1;
        self.status = Status::InFlight;

        let request = AnalysisRequest {
            code: buffer.get().to_string(),
            language: buffer.language(),
        };
        debug!(
            generation = self.generation,
            code_len = request.code.len(),
            language = %request.language,
            "dispatching analysis"
        );

        Dispatch {
            generation: self.generation,
            request,
        }
    }

    /// Settle a dispatch with the transport outcome, validating the body.
    pub fn complete(
        &mut self,
        generation: u64,
        outcome: Result<String, TransportError>,
    ) -> Completion {
        if !self.accepts(generation) {
            return self.superseded(generation);
        }
        let parsed = outcome
            .map_err(AnalysisError::from)
            .and_then(|body| result::parse_response(&body).map_err(AnalysisError::from));
        self.settle(generation, parsed)
    }

    /// Settle a dispatch with an already validated outcome.
    pub fn settle(
        &mut self,
        generation: u64,
        outcome: Result<AnalysisResponse, AnalysisError>,
    ) -> Completion {
        if !self.accepts(generation) {
            return self.superseded(generation);
        }

        match outcome {
            Ok(response) => {
                info!(
                    generation,
                    findings = response.findings.len(),
                    has_smell = response.prediction.has_smell,
                    "analysis succeeded"
                );
                self.results = Arc::new(ResultModel::from_response(response));
                self.status = Status::Succeeded;
            }
            Err(e) => {
                warn!(generation, error = %e, "analysis failed");
                self.status = Status::Failed {
                    error: e.to_string(),
                };
            }
        }
        Completion::Applied(self.status.clone())
    }

    /// Return a settled session to idle. Results are kept.
    pub fn dismiss(&mut self) {
        if self.status.is_terminal() {
            self.status = Status::Idle;
        }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.status.last_error()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn results(&self) -> Arc<ResultModel> {
        Arc::clone(&self.results)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status.clone(),
            generation: self.generation,
            results: self.results(),
        }
    }

    fn accepts(&self, generation: u64) -> bool {
        generation == self.generation && self.status.is_in_flight()
    }

    fn superseded(&self, generation: u64) -> Completion {
        debug!(
            generation,
            current = self.generation,
            "discarding superseded response"
        );
        Completion::Superseded {
            generation,
            current: self.generation,
        }
    }
}

/// Async session driving requests through a [`Transport`].
///
/// Cloning yields another handle onto the same session.
pub struct AnalysisSession<T> {
    transport: Arc<T>,
    state: Arc<RwLock<SessionState>>,
}

impl<T> Clone for AnalysisSession<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Transport> AnalysisSession<T> {
    pub fn new(transport: T) -> Self {
        Self::with_transport(Arc::new(transport))
    }

    pub fn with_transport(transport: Arc<T>) -> Self {
        Self {
            transport,
            state: Arc::new(RwLock::new(SessionState::new())),
        }
    }

    /// Start an analysis of the buffer's current text.
    ///
    /// Returns once the session is in flight; the request itself runs on a
    /// spawned tokio task, so this must be called inside a runtime.
    pub fn analyze(&self, buffer: &CodeBuffer) -> JoinHandle<Completion> {
        self.spawn(buffer).1
    }

    /// Run a full cycle and wait for it to settle.
    pub async fn analyze_and_wait(&self, buffer: &CodeBuffer) -> Completion {
        let (generation, handle) = self.spawn(buffer);
        match handle.await {
            Ok(completion) => completion,
            // Only reachable if the task was cancelled, e.g. at runtime shutdown.
            Err(e) => write_state(&self.state)
                .settle(generation, Err(AnalysisError::Aborted(e.to_string()))),
        }
    }

    fn spawn(&self, buffer: &CodeBuffer) -> (u64, JoinHandle<Completion>) {
        let dispatch = write_state(&self.state).begin(buffer);
        let generation = dispatch.generation;
        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.state);

        // A panicking transport still settles its generation, whichever
        // entry point started it.
        let handle = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(transport.analyze(&dispatch.request))
                .catch_unwind()
                .await;
            match outcome {
                Ok(outcome) => complete(&state, dispatch.generation, outcome),
                Err(payload) => write_state(&state).settle(
                    dispatch.generation,
                    Err(AnalysisError::Aborted(panic_message(payload.as_ref()))),
                ),
            }
        });
        (generation, handle)
    }

    pub fn status(&self) -> Status {
        read_state(&self.state).status().clone()
    }

    pub fn last_error(&self) -> Option<String> {
        read_state(&self.state).last_error().map(str::to_string)
    }

    pub fn results(&self) -> Arc<ResultModel> {
        read_state(&self.state).results()
    }

    pub fn generation(&self) -> u64 {
        read_state(&self.state).generation()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        read_state(&self.state).snapshot()
    }

    pub fn dismiss(&self) {
        write_state(&self.state).dismiss();
    }
}

fn complete(
    state: &RwLock<SessionState>,
    generation: u64,
    outcome: Result<String, TransportError>,
) -> Completion {
    write_state(state).complete(generation, outcome)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "transport panicked".to_string()
    }
}

// A panic while holding the lock cannot leave the state half-written: every
// transition assigns whole fields, so a poisoned lock is still usable.
fn read_state(state: &RwLock<SessionState>) -> RwLockReadGuard<'_, SessionState> {
    state.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_state(state: &RwLock<SessionState>) -> RwLockWriteGuard<'_, SessionState> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}
