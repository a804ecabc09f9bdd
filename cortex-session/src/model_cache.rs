//! Process-wide model cache keyed by resolved artifact path (spec §3 "Model
//! cache": distinct sessions for the same `modelId` share one loaded model).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use cortex_native::{Backend, ModelHandle, ModelLoadParams};
use cortex_types::ModelMetadata;

use crate::error::SessionError;

struct CacheEntry {
    model: Arc<ModelHandle>,
    metadata: ModelMetadata,
}

/// Loads and caches [`ModelHandle`]s so that every session pool entry for the
/// same resolved path reuses one in-memory model instead of reloading it.
pub struct ModelCache {
    models_dir: PathBuf,
    backend: Backend,
    load_params: ModelLoadParams,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ModelCache {
    pub fn new(models_dir: PathBuf, backend: Backend, load_params: ModelLoadParams) -> Self {
        Self {
            models_dir,
            backend,
            load_params,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `model_id` and return its cached model + metadata, loading it
    /// on first use. Distinct model ids that resolve to the same on-disk
    /// path share one [`ModelHandle`].
    pub async fn get_or_load(
        &self,
        model_id: &str,
    ) -> Result<(Arc<ModelHandle>, ModelMetadata), SessionError> {
        let path = cortex_gguf::resolve_model_path(&self.models_dir, model_id).map_err(|source| {
            SessionError::ModelResolution {
                model_id: model_id.to_string(),
                source,
            }
        })?;
        let key = path.display().to_string();

        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get(&key) {
            return Ok((Arc::clone(&entry.model), entry.metadata.clone()));
        }

        let metadata = cortex_gguf::load_model_metadata(model_id, &path).map_err(|source| {
            SessionError::ModelResolution {
                model_id: model_id.to_string(),
                source,
            }
        })?;
        let model = ModelHandle::load(self.backend, &path, self.load_params).map_err(|source| {
            SessionError::Construction {
                model_id: model_id.to_string(),
                source,
            }
        })?;
        let model = Arc::new(model);

        entries.insert(
            key,
            CacheEntry {
                model: Arc::clone(&model),
                metadata: metadata.clone(),
            },
        );
        Ok((model, metadata))
    }

    /// Number of distinct models currently resident.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Model ids of every currently loaded model, for health reporting.
    pub async fn loaded_model_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .lock()
            .await
            .values()
            .map(|entry| entry.metadata.model_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Largest context window across every loaded model, for capability
    /// advertisement; `0` if nothing has been loaded yet.
    pub async fn max_context_window(&self) -> u32 {
        self.entries
            .lock()
            .await
            .values()
            .map(|entry| entry.metadata.context_window)
            .max()
            .unwrap_or(0)
    }

    pub fn load_params(&self) -> ModelLoadParams {
        self.load_params
    }
}
