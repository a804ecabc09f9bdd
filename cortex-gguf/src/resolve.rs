//! Model id → artifact path resolution (spec §4.2 "Path resolution rule").

use std::path::{Path, PathBuf};

use crate::error::GgufError;

/// Resolve a model id to a concrete `.gguf` path under `base_dir`.
///
/// If `model_id` contains a path separator it's treated as a path (absolute
/// or relative to the current directory) and used as-is if it exists.
/// Otherwise, `<base_dir>/<id>.gguf` is tried, then `<base_dir>/<id>`.
pub fn resolve_model_path(base_dir: &Path, model_id: &str) -> Result<PathBuf, GgufError> {
    if model_id.contains('/') || model_id.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(model_id);
        return if path.exists() {
            Ok(path)
        } else {
            Err(GgufError::ModelNotFound {
                model_id: model_id.to_string(),
                base_dir: base_dir.display().to_string(),
            })
        };
    }

    let with_extension = base_dir.join(format!("{model_id}.gguf"));
    if with_extension.exists() {
        return Ok(with_extension);
    }

    let bare = base_dir.join(model_id);
    if bare.exists() {
        return Ok(bare);
    }

    Err(GgufError::ModelNotFound {
        model_id: model_id.to_string(),
        base_dir: base_dir.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn resolves_by_appending_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("llama-3.gguf"), b"stub").unwrap();
        let resolved = resolve_model_path(dir.path(), "llama-3").unwrap();
        assert_eq!(resolved, dir.path().join("llama-3.gguf"));
    }

    #[test]
    fn resolves_bare_filename_when_extension_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("llama-3"), b"stub").unwrap();
        let resolved = resolve_model_path(dir.path(), "llama-3").unwrap();
        assert_eq!(resolved, dir.path().join("llama-3"));
    }

    #[test]
    fn treats_ids_with_separators_as_paths() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("nested").join("model.gguf");
        fs::create_dir_all(explicit.parent().unwrap()).unwrap();
        fs::write(&explicit, b"stub").unwrap();
        let resolved = resolve_model_path(dir.path(), explicit.to_str().unwrap()).unwrap();
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn errors_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_model_path(dir.path(), "missing-model").unwrap_err();
        assert!(matches!(err, GgufError::ModelNotFound { .. }));
    }
}
