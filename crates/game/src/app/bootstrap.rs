use std::str::FromStr;

use doorway_engine::{resolve_app_paths, AppPaths, DoorwayConfig, StartupError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const START_SCENE_ENV_VAR: &str = "DOORWAY_START_SCENE";
const TICKS_ENV_VAR: &str = "DOORWAY_TICKS";
const TPS_ENV_VAR: &str = "DOORWAY_TPS";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunConfig {
    /// First scene of the catalog when unset.
    pub(crate) start_scene: Option<String>,
    pub(crate) target_tps: u32,
    pub(crate) max_ticks: u32,
    pub(crate) doorway: DoorwayConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start_scene: None,
            target_tps: 60,
            max_ticks: 1800,
            doorway: DoorwayConfig::default(),
        }
    }
}

impl RunConfig {
    pub(crate) fn fixed_dt_seconds(&self) -> f32 {
        1.0 / self.target_tps.max(1) as f32
    }

    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(scene) = lookup(START_SCENE_ENV_VAR)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
        {
            config.start_scene = Some(scene);
        }
        if let Some(ticks) = parse_positive(TICKS_ENV_VAR, lookup(TICKS_ENV_VAR)) {
            config.max_ticks = ticks;
        }
        if let Some(tps) = parse_positive(TPS_ENV_VAR, lookup(TPS_ENV_VAR)) {
            config.target_tps = tps;
        }
        config
    }
}

fn parse_positive<T>(var: &'static str, raw: Option<String>) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            warn!(var, value = %raw, "env_override_ignored");
            None
        }
    }
}

pub(crate) struct AppWiring {
    pub(crate) paths: AppPaths,
    pub(crate) config: RunConfig,
}

pub(crate) fn build_app() -> Result<AppWiring, StartupError> {
    init_tracing();
    info!("=== Doorway Startup ===");

    let paths = resolve_app_paths()?;
    let config = RunConfig::from_env();
    info!(
        root = %paths.root.display(),
        scenes_dir = %paths.scenes_dir.display(),
        tps = config.target_tps,
        max_ticks = config.max_ticks,
        start_scene = config.start_scene.as_deref().unwrap_or("<first>"),
        "startup_config_resolved"
    );

    Ok(AppWiring { paths, config })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
