use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::catalog::SceneCatalog;
use super::compiler::{
    compile_catalog_json, compile_catalog_xml, ContentCompileError, ContentErrorCode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CatalogFormat {
    Xml,
    Json,
}

/// Loads every `*.xml` and `*.json` file under `scenes_dir` in sorted relative-path
/// order and merges them into one catalog. A scene id may only be defined once
/// across all files.
pub fn load_scene_catalog(scenes_dir: &Path) -> Result<SceneCatalog, ContentCompileError> {
    if !scenes_dir.is_dir() {
        return Err(ContentCompileError {
            code: ContentErrorCode::Discovery,
            message: "scene catalog directory does not exist".to_string(),
            file_path: scenes_dir.to_path_buf(),
            location: None,
        });
    }

    let files = collect_catalog_files(scenes_dir)?;
    let mut merged = SceneCatalog::default();
    let mut defined_in = HashSet::<String>::new();

    for (format, path) in &files {
        let raw = fs::read_to_string(path).map_err(|error| ContentCompileError {
            code: ContentErrorCode::ReadFile,
            message: format!("failed to read catalog file: {error}"),
            file_path: path.clone(),
            location: None,
        })?;
        let catalog = match format {
            CatalogFormat::Xml => compile_catalog_xml(path, &raw)?,
            CatalogFormat::Json => compile_catalog_json(path, &raw)?,
        };
        for scene in catalog.scenes {
            if !defined_in.insert(scene.id.as_str().to_string()) {
                return Err(ContentCompileError {
                    code: ContentErrorCode::DuplicateScene,
                    message: format!("scene '{}' is defined by more than one file", scene.id),
                    file_path: path.clone(),
                    location: None,
                });
            }
            merged.scenes.push(scene);
        }
        merged.overrides.extend(catalog.overrides);
    }

    info!(
        dir = %scenes_dir.display(),
        file_count = files.len(),
        scene_count = merged.scenes.len(),
        exit_count = merged.exit_count(),
        "scene_catalog_loaded"
    );
    Ok(merged)
}

fn collect_catalog_files(
    root: &Path,
) -> Result<Vec<(CatalogFormat, PathBuf)>, ContentCompileError> {
    let mut files = Vec::<(String, CatalogFormat, PathBuf)>::new();
    collect_recursive(root, root, &mut files)?;
    files.sort_by(|(a, _, _), (b, _, _)| a.cmp(b));
    Ok(files
        .into_iter()
        .map(|(_, format, path)| (format, path))
        .collect())
}

fn collect_recursive(
    root: &Path,
    current: &Path,
    files: &mut Vec<(String, CatalogFormat, PathBuf)>,
) -> Result<(), ContentCompileError> {
    let discovery_error = |path: &Path, error: std::io::Error| ContentCompileError {
        code: ContentErrorCode::Discovery,
        message: format!("failed to list catalog directory: {error}"),
        file_path: path.to_path_buf(),
        location: None,
    };

    let entries = fs::read_dir(current).map_err(|error| discovery_error(current, error))?;
    for entry in entries {
        let entry = entry.map_err(|error| discovery_error(current, error))?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(root, &path, files)?;
            continue;
        }
        let Some(format) = catalog_format(&path) else {
            continue;
        };
        let rel = path.strip_prefix(root).unwrap_or(&path);
        files.push((normalize_rel_path(rel), format, path.clone()));
    }
    Ok(())
}

fn catalog_format(path: &Path) -> Option<CatalogFormat> {
    let ext = path.extension()?.to_str()?;
    if ext.eq_ignore_ascii_case("xml") {
        Some(CatalogFormat::Xml)
    } else if ext.eq_ignore_ascii_case("json") {
        Some(CatalogFormat::Json)
    } else {
        None
    }
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}
