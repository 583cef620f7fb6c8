//! Speech inference pipelines.
//!
//! This module provides trait abstractions for pipeline providers and loaded
//! inference functions, plus the raw result shape different model families
//! report their transcript in.

use std::sync::Arc;

use async_trait::async_trait;

use crate::audio::AudioBuffer;
use crate::config::{Backend, SpeechModel};
use crate::error::{ModelLoadError, PipelineError};

mod whisper;

pub use whisper::{WhisperPipeline, WhisperProvider};

/// Inference task kind requested from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    AutomaticSpeechRecognition,
}

/// A request for a loaded inference pipeline.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub task: TaskKind,
    pub model: SpeechModel,
    pub backend: Backend,
}

/// Per-call decoding directives.
#[derive(Debug, Clone, Default)]
pub struct InferenceOptions {
    /// Optional prompt steering the decoder (vocabulary, language or task
    /// hints).
    pub prompt: Option<String>,
}

/// Raw result of one inference call.
///
/// Some model families report the transcript as `text`, others as
/// `generated_text`; [`TranscriptionOutput::resolve_text`] reconciles them.
#[derive(Debug, Clone, Default)]
pub struct TranscriptionOutput {
    pub text: Option<String>,
    pub generated_text: Option<String>,
}

impl TranscriptionOutput {
    /// The display transcript: `text` when present, else `generated_text`,
    /// else the empty string.
    pub fn resolve_text(&self) -> &str {
        self.text
            .as_deref()
            .or(self.generated_text.as_deref())
            .unwrap_or("")
    }
}

/// A loaded inference function bound to a model and compute backend.
#[async_trait]
pub trait SpeechPipeline: Send + Sync {
    /// Transcribe mono PCM audio to text.
    async fn transcribe(
        &self,
        audio: &AudioBuffer,
        options: &InferenceOptions,
    ) -> Result<TranscriptionOutput, PipelineError>;
}

/// Loads inference pipelines.
///
/// Implementations own model acquisition and context initialization; the
/// returned pipeline is ready to transcribe.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn load(
        &self,
        request: &PipelineRequest,
    ) -> Result<Arc<dyn SpeechPipeline>, ModelLoadError>;
}
