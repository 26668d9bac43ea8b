use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SceneId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for SceneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Owner of the active scene. The doorway registry only ever asks it to load a scene;
/// unloading, asset loading and re-registering doorways are the implementor's job.
pub trait SceneManager {
    fn load_scene(&mut self, scene_id: &SceneId);
    fn current_scene(&self) -> Option<&SceneId>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneSwitch {
    pub from: Option<SceneId>,
    pub to: SceneId,
}

/// Queues load requests and applies them at a frame boundary, so a request made
/// mid-update never changes the scene the rest of that update is iterating.
#[derive(Debug, Default)]
pub struct SceneSwitcher {
    current: Option<SceneId>,
    pending: Option<SceneId>,
    load_requests: u64,
}

impl SceneSwitcher {
    pub fn new(start: SceneId) -> Self {
        Self {
            current: Some(start),
            pending: None,
            load_requests: 0,
        }
    }

    pub fn pending(&self) -> Option<&SceneId> {
        self.pending.as_ref()
    }

    pub fn load_requests(&self) -> u64 {
        self.load_requests
    }

    /// Returns the switch that took effect, if any. A request for the already
    /// active scene is dropped.
    pub fn apply_pending(&mut self) -> Option<SceneSwitch> {
        let next = self.pending.take()?;
        if self.current.as_ref() == Some(&next) {
            debug!(scene = %next, "scene_switch_ignored_already_active");
            return None;
        }
        let from = self.current.replace(next.clone());
        info!(
            from = from.as_ref().map(SceneId::as_str).unwrap_or("<none>"),
            to = %next,
            "scene_switched"
        );
        Some(SceneSwitch { from, to: next })
    }
}

impl SceneManager for SceneSwitcher {
    fn load_scene(&mut self, scene_id: &SceneId) {
        self.load_requests = self.load_requests.saturating_add(1);
        // Last request in a frame wins; the registry cooldown keeps this to one in practice.
        self.pending = Some(scene_id.clone());
    }

    fn current_scene(&self) -> Option<&SceneId> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_request_is_deferred_until_applied() {
        let mut switcher = SceneSwitcher::new(SceneId::from("room1"));
        switcher.load_scene(&SceneId::from("room2"));

        assert_eq!(switcher.current_scene(), Some(&SceneId::from("room1")));
        assert_eq!(switcher.pending(), Some(&SceneId::from("room2")));

        let switch = switcher.apply_pending().expect("switch");
        assert_eq!(switch.from, Some(SceneId::from("room1")));
        assert_eq!(switch.to, SceneId::from("room2"));
        assert_eq!(switcher.current_scene(), Some(&SceneId::from("room2")));
        assert!(switcher.pending().is_none());
    }

    #[test]
    fn switching_to_active_scene_is_a_no_op() {
        let mut switcher = SceneSwitcher::new(SceneId::from("room1"));
        switcher.load_scene(&SceneId::from("room1"));
        assert!(switcher.apply_pending().is_none());
        assert_eq!(switcher.current_scene(), Some(&SceneId::from("room1")));
        assert_eq!(switcher.load_requests(), 1);
    }

    #[test]
    fn apply_without_request_returns_none() {
        let mut switcher = SceneSwitcher::default();
        assert!(switcher.apply_pending().is_none());
        assert!(switcher.current_scene().is_none());
    }

    #[test]
    fn scene_id_displays_raw_string() {
        assert_eq!(SceneId::new("arcade").to_string(), "arcade");
    }
}
