use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod config;
pub mod content;
pub mod doorway;
pub mod geometry;
pub mod registry;
pub mod scene;
pub mod spatial;

pub use config::DoorwayConfig;
pub use content::{
    catalog_fingerprint, compile_catalog_json, compile_catalog_xml, load_scene_catalog,
    ContentCompileError, ContentErrorCode, DoorwayOverride, ExitDescriptor, OverrideTable,
    SceneCatalog, SceneDef, SourceLocation,
};
pub use doorway::{Direction, Doorway, DoorwayEvent, DoorwayKind, DoorwayState, WallSide};
pub use geometry::{GridPos, IsoProjection, WorldPos};
pub use registry::{
    BuildReport, DoorwayDebugEntry, DoorwayDebugSnapshot, DoorwayRegistry, SkipReason,
    SkippedExit,
};
pub use scene::{SceneId, SceneManager, SceneSwitch, SceneSwitcher};
pub use spatial::{DoorwayRef, GridSpatialIndex, SpatialIndex};

pub const ROOT_ENV_VAR: &str = "DOORWAY_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub scenes_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: PathBuf) -> Self {
        let scenes_dir = root.join("assets").join("scenes");
        Self { root, scenes_dir }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "DOORWAY_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/doorways\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    resolve_root().map(AppPaths::from_root)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            find_root_from(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
}

fn is_repo_marker(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("assets").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml_and_assets() {
        let temp = TempDir::new().expect("tempdir");
        assert!(!is_repo_marker(temp.path()));

        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("write");
        assert!(!is_repo_marker(temp.path()));

        fs::create_dir(temp.path().join("assets")).expect("mkdir");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn root_is_found_from_nested_directory() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("write");
        fs::create_dir(temp.path().join("assets")).expect("mkdir");
        let nested = temp.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("mkdir");

        let root = find_root_from(&nested).expect("root");
        assert_eq!(root, normalize_path(temp.path()));
    }

    #[test]
    fn app_paths_point_at_scene_directory() {
        let paths = AppPaths::from_root(PathBuf::from("/srv/doorways"));
        assert_eq!(
            paths.scenes_dir,
            PathBuf::from("/srv/doorways").join("assets").join("scenes")
        );
    }
}
