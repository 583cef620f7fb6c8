//! Model download and management.
//!
//! Handles automatic downloading of GGML speech models on first use.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::error::ModelLoadError;

/// Identifier for downloadable models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelId {
    /// Whisper tiny model (~75MB).
    WhisperTiny,
    /// Whisper tiny English-only model (~75MB).
    WhisperTinyEn,
    /// Whisper base model (~150MB).
    WhisperBase,
    /// Whisper base English-only model (~150MB).
    WhisperBaseEn,
    /// Whisper small model (~500MB).
    WhisperSmall,
    /// Whisper small English-only model (~500MB).
    WhisperSmallEn,
    /// Whisper medium model (~1.5GB).
    WhisperMedium,
    /// Whisper medium English-only model (~1.5GB).
    WhisperMediumEn,
    /// Whisper large-v3 model (~3GB).
    WhisperLargeV3,
    /// Whisper large-v3-turbo model (~1.5GB).
    WhisperLargeV3Turbo,
}

const WHISPER_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

impl ModelId {
    /// Get model metadata.
    fn info(&self) -> ModelInfo {
        match self {
            ModelId::WhisperTiny => ModelInfo {
                filename: "ggml-tiny.bin",
                url: format!("{}/ggml-tiny.bin", WHISPER_BASE_URL),
                size_bytes: Some(77_691_713),
            },
            ModelId::WhisperTinyEn => ModelInfo {
                filename: "ggml-tiny.en.bin",
                url: format!("{}/ggml-tiny.en.bin", WHISPER_BASE_URL),
                size_bytes: Some(77_704_715),
            },
            ModelId::WhisperBase => ModelInfo {
                filename: "ggml-base.bin",
                url: format!("{}/ggml-base.bin", WHISPER_BASE_URL),
                size_bytes: Some(147_951_465),
            },
            ModelId::WhisperBaseEn => ModelInfo {
                filename: "ggml-base.en.bin",
                url: format!("{}/ggml-base.en.bin", WHISPER_BASE_URL),
                size_bytes: Some(147_964_211),
            },
            ModelId::WhisperSmall => ModelInfo {
                filename: "ggml-small.bin",
                url: format!("{}/ggml-small.bin", WHISPER_BASE_URL),
                size_bytes: Some(487_601_967),
            },
            ModelId::WhisperSmallEn => ModelInfo {
                filename: "ggml-small.en.bin",
                url: format!("{}/ggml-small.en.bin", WHISPER_BASE_URL),
                size_bytes: Some(487_614_201),
            },
            ModelId::WhisperMedium => ModelInfo {
                filename: "ggml-medium.bin",
                url: format!("{}/ggml-medium.bin", WHISPER_BASE_URL),
                size_bytes: Some(1_533_774_781),
            },
            ModelId::WhisperMediumEn => ModelInfo {
                filename: "ggml-medium.en.bin",
                url: format!("{}/ggml-medium.en.bin", WHISPER_BASE_URL),
                size_bytes: Some(1_533_774_781),
            },
            ModelId::WhisperLargeV3 => ModelInfo {
                filename: "ggml-large-v3.bin",
                url: format!("{}/ggml-large-v3.bin", WHISPER_BASE_URL),
                size_bytes: Some(3_094_623_691),
            },
            ModelId::WhisperLargeV3Turbo => ModelInfo {
                filename: "ggml-large-v3-turbo.bin",
                url: format!("{}/ggml-large-v3-turbo.bin", WHISPER_BASE_URL),
                size_bytes: Some(1_624_592_891),
            },
        }
    }
}

/// Metadata for a downloadable model.
struct ModelInfo {
    /// Filename to save as.
    filename: &'static str,
    /// Download URL.
    url: String,
    /// Expected file size for validation (optional).
    size_bytes: Option<u64>,
}

/// Download progress callback: (bytes received, total bytes if known).
pub type ProgressFn = Box<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Manages model downloads and storage.
///
/// Two provider flags shape its behavior: with `allow_local_models` off,
/// a model file already on disk is ignored and re-fetched; with `use_cache`
/// off, downloads land in a scratch directory that is removed on drop
/// instead of the shared models directory.
pub struct ModelManager {
    models_dir: PathBuf,
    allow_local: bool,
    scratch: Option<PathBuf>,
    progress: Option<ProgressFn>,
}

impl ModelManager {
    /// Create a ModelManager honoring the provider configuration.
    ///
    /// Cached models live in `~/.local/share/audioscribe/models/`.
    pub fn from_config(provider: &ProviderConfig) -> anyhow::Result<Self> {
        let models_dir = crate::dirs::models_dir()?;
        let scratch = if provider.use_cache {
            None
        } else {
            Some(crate::dirs::state_dir()?.join(format!("scratch-{}", std::process::id())))
        };
        Ok(Self {
            models_dir,
            allow_local: provider.allow_local_models,
            scratch,
            progress: None,
        })
    }

    /// Create a ModelManager with a custom models directory.
    pub fn with_dir(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            allow_local: true,
            scratch: None,
            progress: None,
        }
    }

    /// Attach a download progress callback.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Get the directory model files are written to.
    pub fn models_dir(&self) -> &Path {
        self.scratch.as_deref().unwrap_or(&self.models_dir)
    }

    /// Ensure a model is available, downloading if necessary.
    ///
    /// Returns the path to the model file.
    pub async fn ensure_model(&self, model: ModelId) -> Result<PathBuf, ModelLoadError> {
        let info = model.info();
        let model_path = self.models_dir().join(info.filename);

        if !self.allow_local {
            debug!(model = ?model, "Local model lookup disabled, fetching fresh copy");
        } else if model_path.exists() {
            if let Some(expected_size) = info.size_bytes {
                let metadata = fs::metadata(&model_path).await?;
                let actual_size = metadata.len();

                if actual_size == expected_size {
                    debug!(path = %model_path.display(), "Model already exists");
                    return Ok(model_path);
                }
                warn!(
                    model = ?model,
                    expected = expected_size,
                    actual = actual_size,
                    "Model size mismatch, re-downloading"
                );
                fs::remove_file(&model_path).await?;
            } else {
                debug!(path = %model_path.display(), "Model already exists");
                return Ok(model_path);
            }
        }

        self.download_model(&info, &model_path).await?;
        Ok(model_path)
    }

    /// Download a model from its URL, streaming to a temporary file that is
    /// renamed into place once complete.
    async fn download_model(&self, info: &ModelInfo, dest: &Path) -> Result<(), ModelLoadError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        info!(
            url = %info.url,
            dest = %dest.display(),
            "Downloading model"
        );

        let response = reqwest::get(&info.url)
            .await
            .map_err(|e| ModelLoadError::Download(format!("request to {} failed: {e}", info.url)))?;

        if !response.status().is_success() {
            return Err(ModelLoadError::Download(format!(
                "HTTP {} from {}",
                response.status(),
                info.url
            )));
        }

        let total = response.content_length().or(info.size_bytes);

        let temp_path = dest.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| ModelLoadError::Download(format!("read body: {e}")))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            if let Some(progress) = &self.progress {
                progress(downloaded, total);
            }
        }

        file.sync_all().await?;
        drop(file);

        if let Some(expected) = info.size_bytes {
            if downloaded != expected {
                let _ = fs::remove_file(&temp_path).await;
                return Err(ModelLoadError::SizeMismatch {
                    expected,
                    actual: downloaded,
                });
            }
        }

        fs::rename(&temp_path, dest).await?;

        info!(
            path = %dest.display(),
            size = downloaded,
            "Model downloaded successfully"
        );

        Ok(())
    }
}

impl Drop for ModelManager {
    fn drop(&mut self) {
        if let Some(scratch) = &self.scratch {
            let _ = std::fs::remove_dir_all(scratch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_model_info() {
        let info = ModelId::WhisperBase.info();
        assert_eq!(info.filename, "ggml-base.bin");
        assert!(info.url.contains("whisper.cpp"));
    }

    #[test]
    fn test_model_manager_custom_dir() {
        let temp = TempDir::new().unwrap();
        let manager = ModelManager::with_dir(temp.path());
        assert_eq!(manager.models_dir(), temp.path());
    }

    #[tokio::test]
    async fn test_existing_model_with_expected_size_is_reused() {
        let temp = TempDir::new().unwrap();
        let manager = ModelManager::with_dir(temp.path());

        // Seed a file matching the published size so no download is attempted
        let info = ModelId::WhisperTiny.info();
        let path = temp.path().join(info.filename);
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(info.size_bytes.unwrap()).unwrap();

        let resolved = manager.ensure_model(ModelId::WhisperTiny).await.unwrap();
        assert_eq!(resolved, path);
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        let scratch = temp.path().join("scratch");
        std::fs::create_dir_all(&scratch).unwrap();

        let manager = ModelManager {
            models_dir: temp.path().to_path_buf(),
            allow_local: true,
            scratch: Some(scratch.clone()),
            progress: None,
        };
        assert_eq!(manager.models_dir(), scratch);

        drop(manager);
        assert!(!scratch.exists());
    }
}
