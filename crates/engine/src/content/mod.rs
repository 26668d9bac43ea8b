mod catalog;
mod compiler;
mod discovery;
mod hashing;
mod overrides;

pub use catalog::{DoorwayOverride, ExitDescriptor, SceneCatalog, SceneDef, DEFAULT_SCENE_EXTENT};
pub use compiler::{
    compile_catalog_json, compile_catalog_xml, ContentCompileError, ContentErrorCode,
    SourceLocation,
};
pub use discovery::load_scene_catalog;
pub use hashing::catalog_fingerprint;
pub use overrides::{AuthoredOverride, OverrideTable, AUTHORED_DOORWAY_OVERRIDES};
