use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::doorway::Direction;
use crate::scene::SceneId;

use super::catalog::{DoorwayOverride, ExitDescriptor, SceneCatalog, SceneDef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    Discovery,
    ReadFile,
    XmlMalformed,
    JsonMalformed,
    InvalidRoot,
    UnknownElement,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateScene,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

pub fn compile_catalog_json(
    file_path: &Path,
    raw: &str,
) -> Result<SceneCatalog, ContentCompileError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, SceneCatalog>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        let source = error.into_inner();
        let location = (source.line() > 0).then(|| SourceLocation {
            line: source.line(),
            column: source.column(),
        });
        let message = if path.is_empty() || path == "." {
            format!("malformed catalog json: {source}")
        } else {
            format!("malformed catalog json at {path}: {source}")
        };
        ContentCompileError {
            code: ContentErrorCode::JsonMalformed,
            message,
            file_path: file_path.to_path_buf(),
            location,
        }
    })
}

/// Compiles a `<Scenes>` document. Exit attributes that are absent stay `None`
/// so the registry can skip the descriptor with a diagnostic; attributes that
/// are present but unparseable fail the whole file.
pub fn compile_catalog_xml(
    file_path: &Path,
    raw: &str,
) -> Result<SceneCatalog, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Scenes" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <Scenes>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut catalog = SceneCatalog::default();
    let mut seen_scenes = HashSet::<String>::new();
    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "SceneDef" => {
                let scene = parse_scene_def(file_path, &doc, child)?;
                if !seen_scenes.insert(scene.id.as_str().to_string()) {
                    return Err(error_at_node(
                        ContentErrorCode::DuplicateScene,
                        format!("duplicate SceneDef '{}'", scene.id),
                        file_path,
                        &doc,
                        child,
                    ));
                }
                catalog.scenes.push(scene);
            }
            "DoorwayOverride" => {
                catalog
                    .overrides
                    .push(parse_override(file_path, &doc, child)?);
            }
            other => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownElement,
                    format!(
                        "unsupported element <{other}>; expected <SceneDef> or <DoorwayOverride>"
                    ),
                    file_path,
                    &doc,
                    child,
                ))
            }
        }
    }

    Ok(catalog)
}

fn parse_scene_def(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<SceneDef, ContentCompileError> {
    check_attributes(file_path, doc, node, &["id", "width", "height"])?;
    let Some(id) = non_empty_attr(node, "id") else {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            "missing required attribute 'id' on <SceneDef>".to_string(),
            file_path,
            doc,
            node,
        ));
    };

    let mut scene = SceneDef::new(SceneId::new(id));
    if let Some(width) = parse_extent(file_path, doc, node, "width")? {
        scene.width = width;
    }
    if let Some(height) = parse_extent(file_path, doc, node, "height")? {
        scene.height = height;
    }

    for child in node.children().filter(|child| child.is_element()) {
        if child.tag_name().name() != "Exit" {
            return Err(error_at_node(
                ContentErrorCode::UnknownElement,
                format!(
                    "unsupported element <{}> in <SceneDef>; expected <Exit>",
                    child.tag_name().name()
                ),
                file_path,
                doc,
                child,
            ));
        }
        scene.exits.push(parse_exit(file_path, doc, child)?);
    }

    Ok(scene)
}

fn parse_exit(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<ExitDescriptor, ContentCompileError> {
    check_attributes(
        file_path,
        doc,
        node,
        &[
            "direction",
            "to",
            "targetSceneId",
            "gridX",
            "gridY",
            "position",
            "kind",
        ],
    )?;
    if node.has_attribute("to") && node.has_attribute("targetSceneId") {
        return Err(error_at_node(
            ContentErrorCode::DuplicateField,
            "<Exit> may set 'to' or 'targetSceneId', not both".to_string(),
            file_path,
            doc,
            node,
        ));
    }

    let position = parse_f32_attr(file_path, doc, node, "position")?;
    if let Some(position) = position {
        if !(0.0..=1.0).contains(&position) {
            return Err(error_at_node(
                ContentErrorCode::InvalidValue,
                format!("position {position} must lie within 0.0..=1.0"),
                file_path,
                doc,
                node,
            ));
        }
    }

    Ok(ExitDescriptor {
        direction: non_empty_attr(node, "direction"),
        target_scene_id: non_empty_attr(node, "to")
            .or_else(|| non_empty_attr(node, "targetSceneId")),
        grid_x: parse_f32_attr(file_path, doc, node, "gridX")?,
        grid_y: parse_f32_attr(file_path, doc, node, "gridY")?,
        position,
        kind: non_empty_attr(node, "kind"),
    })
}

fn parse_override(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<DoorwayOverride, ContentCompileError> {
    check_attributes(file_path, doc, node, &["scene", "direction", "gridX", "gridY"])?;
    let scene = required_attr(file_path, doc, node, "scene")?;
    let raw_direction = required_attr(file_path, doc, node, "direction")?;
    let Some(direction) = Direction::parse(&raw_direction) else {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!(
                "invalid direction '{raw_direction}'; allowed values: north, south, east, west"
            ),
            file_path,
            doc,
            node,
        ));
    };
    let grid_x = parse_f32_attr(file_path, doc, node, "gridX")?;
    let grid_y = parse_f32_attr(file_path, doc, node, "gridY")?;
    let (Some(grid_x), Some(grid_y)) = (grid_x, grid_y) else {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            "<DoorwayOverride> requires both 'gridX' and 'gridY'".to_string(),
            file_path,
            doc,
            node,
        ));
    };

    Ok(DoorwayOverride {
        scene: SceneId::new(scene),
        direction,
        grid_x,
        grid_y,
    })
}

fn check_attributes(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    allowed: &[&str],
) -> Result<(), ContentCompileError> {
    for attribute in node.attributes() {
        if !allowed.contains(&attribute.name()) {
            return Err(error_at_node(
                ContentErrorCode::UnknownField,
                format!(
                    "unknown attribute '{}' on <{}>",
                    attribute.name(),
                    node.tag_name().name()
                ),
                file_path,
                doc,
                node,
            ));
        }
    }
    Ok(())
}

fn non_empty_attr(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

fn required_attr(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<String, ContentCompileError> {
    non_empty_attr(node, name).ok_or_else(|| {
        error_at_node(
            ContentErrorCode::MissingField,
            format!(
                "missing required attribute '{name}' on <{}>",
                node.tag_name().name()
            ),
            file_path,
            doc,
            node,
        )
    })
}

fn parse_f32_attr(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<Option<f32>, ContentCompileError> {
    let Some(value) = non_empty_attr(node, name) else {
        return Ok(None);
    };
    let parsed = value.parse::<f32>().map_err(|_| {
        error_at_node(
            ContentErrorCode::InvalidValue,
            format!("{name} '{value}' is not a valid number"),
            file_path,
            doc,
            node,
        )
    })?;
    if !parsed.is_finite() {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!("{name} must be finite"),
            file_path,
            doc,
            node,
        ));
    }
    Ok(Some(parsed))
}

fn parse_extent(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    name: &str,
) -> Result<Option<u32>, ContentCompileError> {
    let Some(value) = non_empty_attr(node, name) else {
        return Ok(None);
    };
    match value.parse::<u32>() {
        Ok(parsed) if parsed > 0 => Ok(Some(parsed)),
        _ => Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!("{name} '{value}' must be a positive integer"),
            file_path,
            doc,
            node,
        )),
    }
}

fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentCompileError {
    let pos = doc.text_pos_at(node.range().start);
    ContentCompileError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xml(raw: &str) -> Result<SceneCatalog, ContentCompileError> {
        compile_catalog_xml(Path::new("scenes/world.xml"), raw)
    }

    #[test]
    fn compiles_scenes_exits_and_overrides_in_document_order() {
        let catalog = xml(
            r#"<Scenes>
                <SceneDef id="room1" width="12" height="8">
                    <Exit direction="east" to="room2" gridX="5" gridY="3"/>
                    <Exit direction="north" targetSceneId="attic" position="0.25"/>
                </SceneDef>
                <SceneDef id="room2"/>
                <DoorwayOverride scene="room1" direction="north" gridX="2" gridY="0"/>
            </Scenes>"#,
        )
        .expect("compile");

        assert_eq!(catalog.scenes.len(), 2);
        let room1 = &catalog.scenes[0];
        assert_eq!(room1.id.as_str(), "room1");
        assert_eq!((room1.width, room1.height), (12, 8));
        assert_eq!(
            room1.exits[0],
            ExitDescriptor::floor_portal("east", "room2", 5.0, 3.0)
        );
        assert_eq!(
            room1.exits[1],
            ExitDescriptor::wall("north", "attic", Some(0.25))
        );
        assert_eq!(catalog.scenes[1].exits.len(), 0);
        assert_eq!(catalog.overrides.len(), 1);
        assert_eq!(catalog.overrides[0].direction, Direction::North);
    }

    #[test]
    fn exit_missing_direction_or_target_still_compiles() {
        let catalog = xml(
            r#"<Scenes><SceneDef id="a"><Exit to="b"/><Exit direction="west"/></SceneDef></Scenes>"#,
        )
        .expect("compile");
        let exits = &catalog.scenes[0].exits;
        assert!(exits[0].direction.is_none());
        assert!(exits[1].target_scene_id.is_none());
    }

    #[test]
    fn invalid_root_errors() {
        let err = xml("<Defs/>").expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidRoot);
        assert!(err.location.is_some());
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = xml(r#"<Scenes><SceneDef id="a"></Scenes>"#).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());
        assert!(err.file_path.ends_with("world.xml"));
    }

    #[test]
    fn non_numeric_grid_is_invalid_value() {
        let err = xml(r#"<Scenes><SceneDef id="a"><Exit direction="east" to="b" gridX="five" gridY="3"/></SceneDef></Scenes>"#)
            .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn unknown_attribute_errors() {
        let err = xml(r#"<Scenes><SceneDef id="a"><Exit direction="east" to="b" colour="red"/></SceneDef></Scenes>"#)
            .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownField);
    }

    #[test]
    fn unknown_element_errors() {
        let err = xml(r#"<Scenes><Prop id="lamp"/></Scenes>"#).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownElement);
    }

    #[test]
    fn duplicate_scene_in_file_errors() {
        let err = xml(r#"<Scenes><SceneDef id="a"/><SceneDef id="a"/></Scenes>"#).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateScene);
    }

    #[test]
    fn scene_without_id_errors() {
        let err = xml(r#"<Scenes><SceneDef width="4"/></Scenes>"#).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingField);
    }

    #[test]
    fn position_outside_unit_range_errors() {
        let err = xml(r#"<Scenes><SceneDef id="a"><Exit direction="north" to="b" position="1.5"/></SceneDef></Scenes>"#)
            .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn override_with_bad_direction_errors() {
        let err = xml(r#"<Scenes><DoorwayOverride scene="a" direction="up" gridX="1" gridY="0"/></Scenes>"#)
            .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn both_target_spellings_error() {
        let err = xml(r#"<Scenes><SceneDef id="a"><Exit direction="east" to="b" targetSceneId="c"/></SceneDef></Scenes>"#)
            .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateField);
    }

    #[test]
    fn json_catalog_compiles() {
        let catalog = compile_catalog_json(
            Path::new("scenes/world.json"),
            r#"{"scenes":[{"id":"room1","exits":[{"direction":"east","to":"room2","gridX":5,"gridY":3}]}],
                "overrides":[{"scene":"room1","direction":"north","gridX":1,"gridY":0}]}"#,
        )
        .expect("compile");
        assert_eq!(catalog.scenes[0].exits.len(), 1);
        assert_eq!(catalog.overrides[0].direction, Direction::North);
    }

    #[test]
    fn json_error_reports_field_path() {
        let err = compile_catalog_json(
            Path::new("scenes/world.json"),
            r#"{"scenes":[{"id":"room1","exits":[{"direction":"east","gridX":"five"}]}]}"#,
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::JsonMalformed);
        assert!(err.message.contains("scenes[0].exits[0].gridX"), "{}", err.message);
        assert!(err.location.is_some());
    }
}
