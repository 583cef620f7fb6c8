//! Transcription session orchestration.
//!
//! Wires the model provider, audio decoder, and inference pipeline into one
//! upload-to-transcript flow: decode, infer, reconcile the result shape, and
//! publish state transitions for a presentation layer to render.
//!
//! The model load is kicked off exactly once, in the background, when the
//! session is created. Each submitted upload then runs one cycle of
//! `Decoding -> Transcribing -> {Done | Failed}`; a newer upload supersedes
//! an in-flight one, whose remaining work is cancelled and whose late state
//! writes are discarded.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::decode::AudioDecoder;
use crate::pipeline::{
    InferenceOptions, ModelProvider, PipelineRequest, SpeechPipeline, TaskKind,
};
use crate::source::SourceStore;

/// User-facing message when the model fails to load.
pub const MODEL_LOAD_FAILED: &str = "Failed to load the speech model. Please try again later.";

/// User-facing message when decoding or inference fails for an upload.
pub const TRANSCRIPTION_FAILED: &str =
    "Could not transcribe this file. Please try a different audio file.";

/// Session status visible to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    LoadingModel,
    ModelReady,
    Decoding,
    Transcribing,
    Done,
    Failed,
}

impl Status {
    /// Whether an upload cycle is currently in flight.
    pub fn in_cycle(&self) -> bool {
        matches!(self, Status::Decoding | Status::Transcribing)
    }
}

/// Result of a [`Session::submit`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The upload was processed and produced a transcript.
    Done,
    /// Decoding or inference failed; the session holds the fixed error
    /// message.
    Failed,
    /// The model is not loaded yet. The upload was not accepted and no
    /// state changed.
    NotReady,
    /// A newer upload superseded this one before it finished.
    Superseded,
}

/// Point-in-time view of session state.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: Status,
    pub transcript: String,
    pub error_message: Option<String>,
    /// Playable copy of the most recent upload.
    pub source: Option<PathBuf>,
}

struct SessionInner {
    status: Status,
    transcript: String,
    error_message: Option<String>,
    /// Set at most once, by the background load task.
    pipeline: Option<Arc<dyn SpeechPipeline>>,
    sources: SourceStore,
    /// Generation of the upload cycle currently allowed to mutate state.
    cycle: u64,
    /// Cancellation token of the current upload cycle.
    cycle_cancel: CancellationToken,
}

struct Shared {
    inner: RwLock<SessionInner>,
    event_tx: broadcast::Sender<Status>,
    /// Session-level token, cancelled on teardown.
    cancel: CancellationToken,
}

impl Shared {
    /// Run `f` against the state unless the session is tearing down.
    /// Broadcasts the new status if it changed.
    async fn apply(&self, f: impl FnOnce(&mut SessionInner)) -> bool {
        self.apply_for_cycle(None, f).await
    }

    /// Like [`Shared::apply`], but discarded when the owning upload cycle
    /// has been superseded by a newer one.
    async fn apply_for_cycle(
        &self,
        cycle: Option<u64>,
        f: impl FnOnce(&mut SessionInner),
    ) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let mut inner = self.inner.write().await;
        if let Some(cycle) = cycle {
            if inner.cycle != cycle {
                return false;
            }
        }
        let before = inner.status;
        f(&mut inner);
        let after = inner.status;
        drop(inner);

        if before != after {
            let _ = self.event_tx.send(after);
        }
        true
    }
}

/// Transcription session.
///
/// Dropping the session cancels all pending work; no background task
/// mutates state after teardown.
pub struct Session {
    shared: Arc<Shared>,
    decoder: Arc<dyn AudioDecoder>,
    options: InferenceOptions,
}

impl Session {
    /// Create a session and kick off the one-time model load in the
    /// background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: &Config,
        provider: Arc<dyn ModelProvider>,
        decoder: Arc<dyn AudioDecoder>,
        sources: SourceStore,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        let cancel = CancellationToken::new();
        let cycle_cancel = cancel.child_token();

        let shared = Arc::new(Shared {
            inner: RwLock::new(SessionInner {
                status: Status::Idle,
                transcript: String::new(),
                error_message: None,
                pipeline: None,
                sources,
                cycle: 0,
                cycle_cancel,
            }),
            event_tx,
            cancel,
        });

        let request = PipelineRequest {
            task: TaskKind::AutomaticSpeechRecognition,
            model: config.model.model,
            backend: config.provider.backend,
        };
        let options = InferenceOptions {
            prompt: config.model.prompt.clone(),
        };

        tokio::spawn(load_model(Arc::clone(&shared), provider, request));

        Self {
            shared,
            decoder,
            options,
        }
    }

    /// Subscribe to status transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<Status> {
        self.shared.event_tx.subscribe()
    }

    /// Current state snapshot.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.shared.inner.read().await;
        SessionSnapshot {
            status: inner.status,
            transcript: inner.transcript.clone(),
            error_message: inner.error_message.clone(),
            source: inner.sources.current().map(PathBuf::from),
        }
    }

    /// Wait for the one-time model load to finish.
    ///
    /// Returns true once the inference pipeline is available, false if the
    /// load failed.
    pub async fn wait_until_ready(&self) -> bool {
        let mut rx = self.subscribe();
        loop {
            {
                let inner = self.shared.inner.read().await;
                if inner.pipeline.is_some() {
                    return true;
                }
                if inner.status == Status::Failed {
                    return false;
                }
            }
            match rx.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return false,
            }
        }
    }

    /// Process one uploaded audio file: decode, infer, store the transcript.
    ///
    /// Returns [`SubmitOutcome::NotReady`] without touching state when the
    /// model has not loaded yet. Accepting an upload clears the previous
    /// transcript and error, publishes a playable copy of the bytes
    /// (regardless of what decode/inference do later), and cancels any
    /// still-running earlier upload.
    pub async fn submit(&self, file_name: &str, bytes: Vec<u8>) -> SubmitOutcome {
        let shared = &self.shared;

        // Accept the upload: bump the cycle, cancel the previous one, clear
        // prior results, publish the playable copy, enter Decoding.
        let (cycle, cancel, pipeline) = {
            let mut inner = shared.inner.write().await;
            let Some(pipeline) = inner.pipeline.clone() else {
                debug!("Upload ignored: model not ready");
                return SubmitOutcome::NotReady;
            };

            inner.cycle += 1;
            let cycle = inner.cycle;
            inner.cycle_cancel.cancel();
            inner.cycle_cancel = shared.cancel.child_token();
            let cancel = inner.cycle_cancel.clone();

            inner.transcript.clear();
            inner.error_message = None;
            match inner.sources.publish(file_name, &bytes) {
                Ok(path) => debug!(path = %path.display(), "Published playable source"),
                Err(e) => warn!(error = %e, "Failed to publish playable source"),
            }
            inner.status = Status::Decoding;
            (cycle, cancel, pipeline)
        };
        let _ = shared.event_tx.send(Status::Decoding);

        let mut guard = CycleGuard::new(Arc::clone(shared), cycle);

        // Decode
        let decoded = tokio::select! {
            _ = cancel.cancelled() => {
                guard.disarm();
                return SubmitOutcome::Superseded;
            }
            res = self.decoder.decode(&bytes) => res,
        };
        let audio = match decoded {
            Ok(audio) => audio,
            Err(e) => {
                error!(error = %e, "Audio decode failed");
                return self.fail_cycle(&mut guard, cycle).await;
            }
        };
        debug!(
            samples = audio.samples.len(),
            sample_rate = audio.sample_rate,
            duration_secs = audio.duration_secs(),
            "Audio decoded"
        );

        if !shared
            .apply_for_cycle(Some(cycle), |inner| inner.status = Status::Transcribing)
            .await
        {
            guard.disarm();
            return SubmitOutcome::Superseded;
        }

        // Infer
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                guard.disarm();
                return SubmitOutcome::Superseded;
            }
            res = pipeline.transcribe(&audio, &self.options) => res,
        };
        let output = match result {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Inference failed");
                return self.fail_cycle(&mut guard, cycle).await;
            }
        };

        let text = output.resolve_text().to_string();
        info!(chars = text.len(), "Transcription complete");

        let applied = shared
            .apply_for_cycle(Some(cycle), |inner| {
                inner.transcript = text;
                inner.status = Status::Done;
            })
            .await;
        guard.disarm();

        if applied {
            SubmitOutcome::Done
        } else {
            SubmitOutcome::Superseded
        }
    }

    /// Record a failed cycle: fixed user-facing message, transcript cleared.
    async fn fail_cycle(&self, guard: &mut CycleGuard, cycle: u64) -> SubmitOutcome {
        let applied = self
            .shared
            .apply_for_cycle(Some(cycle), |inner| {
                inner.status = Status::Failed;
                inner.transcript.clear();
                inner.error_message = Some(TRANSCRIPTION_FAILED.to_string());
            })
            .await;
        guard.disarm();

        if applied {
            SubmitOutcome::Failed
        } else {
            SubmitOutcome::Superseded
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

/// One-time background model load.
async fn load_model(
    shared: Arc<Shared>,
    provider: Arc<dyn ModelProvider>,
    request: PipelineRequest,
) {
    shared
        .apply(|inner| inner.status = Status::LoadingModel)
        .await;
    info!(model = ?request.model, backend = ?request.backend, "Loading speech model");

    let result = tokio::select! {
        _ = shared.cancel.cancelled() => return,
        res = provider.load(&request) => res,
    };

    match result {
        Ok(pipeline) => {
            shared
                .apply(|inner| {
                    inner.pipeline = Some(pipeline);
                    inner.status = Status::ModelReady;
                })
                .await;
        }
        Err(e) => {
            error!(error = %e, "Model load failed");
            shared
                .apply(|inner| {
                    inner.status = Status::Failed;
                    inner.error_message = Some(MODEL_LOAD_FAILED.to_string());
                })
                .await;
        }
    }
}

/// Scoped cleanup for one upload cycle.
///
/// If the cycle exits without reaching a terminal state - a panic, or the
/// submit future being dropped mid-await - the guard forces `Failed` so the
/// session is never stuck in `Decoding`/`Transcribing`. Writes go through
/// the same stale-cycle check as everything else.
struct CycleGuard {
    shared: Arc<Shared>,
    cycle: u64,
    armed: bool,
}

impl CycleGuard {
    fn new(shared: Arc<Shared>, cycle: u64) -> Self {
        Self {
            shared,
            cycle,
            armed: true,
        }
    }

    /// The cycle reached a terminal state through the normal paths.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let cycle = self.cycle;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                shared
                    .apply_for_cycle(Some(cycle), |inner| {
                        if inner.status.in_cycle() {
                            inner.status = Status::Failed;
                            inner.transcript.clear();
                            inner.error_message = Some(TRANSCRIPTION_FAILED.to_string());
                        }
                    })
                    .await;
            });
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
