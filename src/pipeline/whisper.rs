//! Whisper inference backend.
//!
//! Uses whisper.cpp via whisper-rs for speech-to-text, with GGML weights
//! fetched on demand through the model manager.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

use super::{
    InferenceOptions, ModelProvider, PipelineRequest, SpeechPipeline, TranscriptionOutput,
};
use crate::audio::{AudioBuffer, AudioResampler, MODEL_SAMPLE_RATE};
use crate::config::{Backend, ModelConfig, SpeechModel};
use crate::error::{ModelLoadError, PipelineError};
use crate::models::{ModelId, ModelManager};

/// Provider that loads whisper.cpp pipelines from GGML weights.
pub struct WhisperProvider {
    manager: ModelManager,
    language: Option<String>,
}

impl WhisperProvider {
    /// Create a provider bound to a model manager and model configuration.
    pub fn new(manager: ModelManager, model_config: &ModelConfig) -> Self {
        let language = if model_config.language == "auto" {
            None
        } else {
            Some(model_config.language.clone())
        };
        Self { manager, language }
    }
}

#[async_trait]
impl ModelProvider for WhisperProvider {
    async fn load(
        &self,
        request: &PipelineRequest,
    ) -> Result<Arc<dyn SpeechPipeline>, ModelLoadError> {
        info!(
            task = ?request.task,
            model = ?request.model,
            backend = ?request.backend,
            "Loading speech pipeline"
        );

        let model_id = speech_model_to_model_id(request.model);
        let model_path = self.manager.ensure_model(model_id).await?;

        let use_gpu = matches!(request.backend, Backend::Gpu);
        let language = self.language.clone();
        let pipeline = tokio::task::spawn_blocking(move || {
            WhisperPipeline::new(&model_path, language, use_gpu)
        })
        .await
        .map_err(|e| ModelLoadError::Init(format!("load task failed: {e}")))??;

        Ok(Arc::new(pipeline))
    }
}

/// Whisper speech-to-text pipeline.
///
/// The underlying WhisperContext is leaked intentionally - the model stays
/// loaded for the session lifetime, which avoids self-referential struct
/// patterns while letting the state be reused across transcriptions.
pub struct WhisperPipeline {
    state: Arc<Mutex<WhisperState>>,
    language: Option<String>,
}

impl WhisperPipeline {
    /// Load a Whisper model and create its reusable inference state.
    ///
    /// # Arguments
    /// * `model_path` - Path to the Whisper GGML model file
    /// * `language` - Language code (e.g., "en", "de") or None for auto-detect
    /// * `use_gpu` - Run inference on the GPU backend when available
    pub fn new(
        model_path: impl AsRef<Path>,
        language: Option<String>,
        use_gpu: bool,
    ) -> Result<Self, ModelLoadError> {
        info!(
            path = %model_path.as_ref().display(),
            language = ?language,
            use_gpu = use_gpu,
            "Loading Whisper model"
        );

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(use_gpu);

        let path_str = model_path
            .as_ref()
            .to_str()
            .ok_or_else(|| ModelLoadError::Init("invalid model path".to_string()))?;
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| ModelLoadError::Init(format!("failed to load Whisper model: {e}")))?;

        let ctx_ref: &'static WhisperContext = Box::leak(Box::new(ctx));

        let state = ctx_ref
            .create_state()
            .map_err(|e| ModelLoadError::Init(format!("failed to create Whisper state: {e}")))?;

        info!("Whisper model and state loaded successfully");

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            language,
        })
    }

    /// Get the configured language.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

#[async_trait]
impl SpeechPipeline for WhisperPipeline {
    async fn transcribe(
        &self,
        audio: &AudioBuffer,
        options: &InferenceOptions,
    ) -> Result<TranscriptionOutput, PipelineError> {
        if audio.samples.is_empty() {
            return Err(PipelineError::UnsupportedInput(
                "no audio samples".to_string(),
            ));
        }

        debug!(
            samples = audio.samples.len(),
            sample_rate = audio.sample_rate,
            duration_secs = audio.duration_secs(),
            "Transcribing audio with Whisper"
        );

        // Whisper expects 16kHz input
        let samples = if audio.sample_rate == MODEL_SAMPLE_RATE {
            audio.samples.clone()
        } else {
            let mut resampler = AudioResampler::new(audio.sample_rate, MODEL_SAMPLE_RATE, 1024)
                .map_err(|e| PipelineError::UnsupportedInput(format!("resampler init: {e}")))?;
            resampler
                .process_all(&audio.samples)
                .map_err(|e| PipelineError::Inference(format!("resample: {e}")))?
        };

        let state = Arc::clone(&self.state);
        let language = self.language.clone();
        let prompt = options.prompt.clone();

        tokio::task::spawn_blocking(move || run_inference(&state, language, prompt, &samples))
            .await
            .map_err(|e| PipelineError::Inference(format!("inference task failed: {e}")))?
    }
}

fn run_inference(
    state: &Mutex<WhisperState>,
    language: Option<String>,
    prompt: Option<String>,
    samples: &[f32],
) -> Result<TranscriptionOutput, PipelineError> {
    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

    // Configure language
    if let Some(ref lang) = language {
        params.set_language(Some(lang));
    } else {
        params.set_language(None); // Auto-detect
    }

    if let Some(ref prompt) = prompt {
        params.set_initial_prompt(prompt);
    }

    // Disable printing to stdout
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    let mut state = state
        .lock()
        .map_err(|_| PipelineError::Inference("inference state poisoned".to_string()))?;

    state
        .full(params, samples)
        .map_err(|e| PipelineError::Inference(format!("Whisper inference failed: {e}")))?;

    // Collect all segments
    let num_segments = state.full_n_segments();
    let mut text = String::new();

    for i in 0..num_segments {
        if let Some(segment) = state.get_segment(i) {
            if let Ok(segment_text) = segment.to_str_lossy() {
                text.push_str(&segment_text);
            }
        }
    }

    debug!(text_len = text.len(), "Transcription complete");

    Ok(TranscriptionOutput {
        text: Some(text.trim().to_string()),
        generated_text: None,
    })
}

/// Convert the configured SpeechModel to a ModelId for download.
pub(crate) fn speech_model_to_model_id(model: SpeechModel) -> ModelId {
    match model {
        SpeechModel::WhisperTiny => ModelId::WhisperTiny,
        SpeechModel::WhisperTinyEn => ModelId::WhisperTinyEn,
        SpeechModel::WhisperBase => ModelId::WhisperBase,
        SpeechModel::WhisperBaseEn => ModelId::WhisperBaseEn,
        SpeechModel::WhisperSmall => ModelId::WhisperSmall,
        SpeechModel::WhisperSmallEn => ModelId::WhisperSmallEn,
        SpeechModel::WhisperMedium => ModelId::WhisperMedium,
        SpeechModel::WhisperMediumEn => ModelId::WhisperMediumEn,
        SpeechModel::WhisperLargeV3 => ModelId::WhisperLargeV3,
        SpeechModel::WhisperLargeV3Turbo => ModelId::WhisperLargeV3Turbo,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_model_to_model_id() {
        assert_eq!(
            speech_model_to_model_id(SpeechModel::WhisperBase),
            ModelId::WhisperBase
        );
        assert_eq!(
            speech_model_to_model_id(SpeechModel::WhisperLargeV3Turbo),
            ModelId::WhisperLargeV3Turbo
        );
    }

    #[test]
    fn test_language_auto_maps_to_none() {
        let manager = ModelManager::with_dir("/tmp/unused");
        let provider = WhisperProvider::new(manager, &ModelConfig::default());
        assert!(provider.language.is_none());
    }

    #[test]
    fn test_language_fixed_is_kept() {
        let manager = ModelManager::with_dir("/tmp/unused");
        let config = ModelConfig {
            language: "en".to_string(),
            ..Default::default()
        };
        let provider = WhisperProvider::new(manager, &config);
        assert_eq!(provider.language.as_deref(), Some("en"));
    }
}
