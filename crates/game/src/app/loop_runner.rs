use std::process::ExitCode;

use doorway_engine::{
    load_scene_catalog, BuildReport, ContentCompileError, DoorwayRegistry, GridPos,
    GridSpatialIndex, SceneCatalog, SceneId, SceneManager, SceneSwitcher, StartupError,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use super::bootstrap::{AppWiring, RunConfig};
use super::walker::Walker;

#[derive(Debug, Error)]
pub(crate) enum RunError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Content(#[from] ContentCompileError),
    #[error("scene catalog is empty")]
    EmptyCatalog,
    #[error("start scene '{0}' is not in the scene catalog")]
    UnknownStartScene(String),
    #[error("failed to encode run report: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RunSummary {
    pub(crate) ticks: u32,
    pub(crate) scene_switches: u32,
    pub(crate) visited: Vec<SceneId>,
    pub(crate) final_scene: SceneId,
    pub(crate) doorways: usize,
    pub(crate) skipped_exits: usize,
    pub(crate) catalog_fingerprint: Option<String>,
}

/// Headless fixed-step loop: one walker, one registry, one scene switcher.
pub(crate) struct Simulation {
    catalog: SceneCatalog,
    registry: DoorwayRegistry,
    spatial_index: GridSpatialIndex,
    switcher: SceneSwitcher,
    walker: Walker,
    build_report: BuildReport,
    fixed_dt_seconds: f32,
    ticks: u32,
    visited: Vec<SceneId>,
}

impl Simulation {
    pub(crate) fn new(catalog: SceneCatalog, config: &RunConfig) -> Result<Self, RunError> {
        let start = match config.start_scene.as_deref() {
            Some(id) => catalog
                .scene(id)
                .map(|scene| scene.id.clone())
                .ok_or_else(|| RunError::UnknownStartScene(id.to_string()))?,
            None => catalog
                .scene_ids()
                .next()
                .cloned()
                .ok_or(RunError::EmptyCatalog)?,
        };

        let mut registry = DoorwayRegistry::new(config.doorway);
        let mut spatial_index = GridSpatialIndex::default();
        let build_report = registry.initialize(&catalog, &mut spatial_index);
        let walker = Walker::new(scene_centre(&catalog, &start));
        info!(scene = %start, "scene_loaded");

        Ok(Self {
            catalog,
            registry,
            spatial_index,
            switcher: SceneSwitcher::new(start.clone()),
            walker,
            build_report,
            fixed_dt_seconds: config.fixed_dt_seconds(),
            ticks: 0,
            visited: vec![start],
        })
    }

    pub(crate) fn current_scene(&self) -> Option<&SceneId> {
        self.switcher.current_scene()
    }

    pub(crate) fn player(&self) -> GridPos {
        self.walker.position
    }

    pub(crate) fn registry(&self) -> &DoorwayRegistry {
        &self.registry
    }

    pub(crate) fn tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
        let Some(current) = self.switcher.current_scene().cloned() else {
            return;
        };

        if let Some(target) = self
            .walker
            .choose_target(self.registry.get_active_doorways(current.as_str()))
        {
            self.walker.advance(target, self.fixed_dt_seconds);
        }
        let player = self.walker.position;
        self.registry.update(
            self.fixed_dt_seconds,
            player.x,
            player.y,
            current.as_str(),
            &mut self.switcher,
        );

        let Some(switch) = self.switcher.apply_pending() else {
            return;
        };
        let arrival = self
            .registry
            .arrival_point(switch.to.as_str(), current.as_str())
            .unwrap_or_else(|| scene_centre(&self.catalog, &switch.to));
        debug!(
            scene = %switch.to,
            grid_x = arrival.x,
            grid_y = arrival.y,
            "player_arrived"
        );
        self.walker.arrive(arrival, current);
        self.visited.push(switch.to);
    }

    pub(crate) fn summary(&self) -> RunSummary {
        RunSummary {
            ticks: self.ticks,
            scene_switches: self.visited.len().saturating_sub(1) as u32,
            visited: self.visited.clone(),
            final_scene: self
                .current_scene()
                .cloned()
                .unwrap_or_else(|| SceneId::from("<none>")),
            doorways: self.spatial_index.len(),
            skipped_exits: self.build_report.skipped.len(),
            catalog_fingerprint: self.registry.catalog_fingerprint().map(str::to_string),
        }
    }
}

fn scene_centre(catalog: &SceneCatalog, scene_id: &SceneId) -> GridPos {
    catalog
        .scene(scene_id.as_str())
        .map(|scene| {
            GridPos::new(
                scene.width.saturating_sub(1) as f32 * 0.5,
                scene.height.saturating_sub(1) as f32 * 0.5,
            )
        })
        .unwrap_or_default()
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_headless(&app) {
        Ok(summary) => {
            info!(
                ticks = summary.ticks,
                scene_switches = summary.scene_switches,
                final_scene = %summary.final_scene,
                "run_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run_failed");
            ExitCode::FAILURE
        }
    }
}

fn run_headless(app: &AppWiring) -> Result<RunSummary, RunError> {
    let catalog = load_scene_catalog(&app.paths.scenes_dir)?;
    let mut simulation = Simulation::new(catalog, &app.config)?;
    for _ in 0..app.config.max_ticks {
        simulation.tick();
    }

    let summary = simulation.summary();
    if let Some(current) = simulation.current_scene() {
        let snapshot = simulation.registry().debug_snapshot(current.as_str());
        info!(snapshot = %serde_json::to_string(&snapshot)?, "doorway_debug_snapshot");
    }
    info!(summary = %serde_json::to_string(&summary)?, "run_summary");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use doorway_engine::{ExitDescriptor, SceneDef};

    use super::*;

    fn loop_catalog() -> SceneCatalog {
        SceneCatalog {
            scenes: vec![
                SceneDef::new("room1")
                    .with_exit(ExitDescriptor::floor_portal("east", "room2", 7.0, 4.5)),
                SceneDef::new("room2")
                    .with_exit(ExitDescriptor::floor_portal("west", "room1", 1.0, 4.5))
                    .with_exit(ExitDescriptor::floor_portal("south", "room3", 4.5, 8.0)),
                SceneDef::new("room3").with_exit(ExitDescriptor::wall("north", "room2", None)),
            ],
            overrides: Vec::new(),
        }
    }

    #[test]
    fn unknown_start_scene_is_rejected() {
        let config = RunConfig {
            start_scene: Some("cellar".to_string()),
            ..RunConfig::default()
        };
        let err = Simulation::new(loop_catalog(), &config).err().expect("err");
        assert!(matches!(err, RunError::UnknownStartScene(id) if id == "cellar"));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let err = Simulation::new(SceneCatalog::default(), &RunConfig::default())
            .err()
            .expect("err");
        assert!(matches!(err, RunError::EmptyCatalog));
    }

    #[test]
    fn walker_travels_through_floor_portals() {
        let mut simulation =
            Simulation::new(loop_catalog(), &RunConfig::default()).expect("simulation");
        assert_eq!(simulation.player(), GridPos::new(4.5, 4.5));

        for _ in 0..600 {
            simulation.tick();
        }

        let summary = simulation.summary();
        assert_eq!(
            summary.visited,
            vec![
                SceneId::from("room1"),
                SceneId::from("room2"),
                SceneId::from("room3"),
            ]
        );
        assert_eq!(summary.final_scene, SceneId::from("room3"));
        assert_eq!(summary.doorways, 4);
        assert_eq!(summary.ticks, 600);
    }

    #[test]
    fn arrival_does_not_bounce_straight_back() {
        let mut simulation =
            Simulation::new(loop_catalog(), &RunConfig::default()).expect("simulation");
        while simulation.current_scene() == Some(&SceneId::from("room1")) {
            simulation.tick();
        }

        assert_eq!(simulation.current_scene(), Some(&SceneId::from("room2")));
        assert_eq!(simulation.player(), GridPos::new(2.0, 4.5));
        simulation.tick();
        assert_eq!(simulation.current_scene(), Some(&SceneId::from("room2")));
    }

    #[test]
    fn summary_serializes_to_json() {
        let simulation =
            Simulation::new(loop_catalog(), &RunConfig::default()).expect("simulation");
        let json = serde_json::to_value(simulation.summary()).expect("json");
        assert_eq!(json["final_scene"], "room1");
        assert_eq!(json["scene_switches"], 0);
        assert!(json["catalog_fingerprint"].is_string());
    }
}
