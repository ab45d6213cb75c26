use geojson::{ feature::Id, Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value };
use std::path::PathBuf;

use crate::aggregate::WindowSelection;
use crate::error::SurfaceError;
use crate::trails::TrailTracker;
use crate::types::StateVector;

pub const POSITIONS_SOURCE: &str = "positions";
pub const TRAILS_SOURCE: &str = "trails";

/// Fixed set of colors handed out by aircraft id
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<String>,
}

impl Palette {
    /// Falls back to white when given no colors
    pub fn new(colors: Vec<String>) -> Self {
        if colors.is_empty() {
            Self { colors: vec!["#FFFFFF".to_string()] }
        } else {
            Self { colors }
        }
    }

    /// Same id, same color, for the lifetime of the process
    pub fn color_for(&self, entity_id: &str) -> &str {
        let idx = (id_hash(entity_id).unsigned_abs() as usize) % self.colors.len();
        &self.colors[idx]
    }
}

fn id_hash(s: &str) -> i32 {
    s.chars().fold(0i32, |hash, c| (c as i32).wrapping_add((hash << 5).wrapping_sub(hash)))
}

/// Both sources of one tick. Surfaces replace their data with it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub positions: FeatureCollection,
    pub trails: FeatureCollection,
}

impl Frame {
    pub fn empty() -> Self {
        Self {
            positions: feature_collection(Vec::new()),
            trails: feature_collection(Vec::new()),
        }
    }
}

fn feature_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection { bbox: None, features, foreign_members: None }
}

fn feature(entity_id: &str, value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: Some(Id::String(entity_id.to_string())),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn opt_number(v: Option<f64>) -> JsonValue {
    v.map(JsonValue::from).unwrap_or(JsonValue::Null)
}

fn position_feature(sv: &StateVector, color: &str) -> Feature {
    let mut props = JsonObject::new();
    props.insert("label".to_string(), JsonValue::from(sv.label()));
    props.insert("velocity".to_string(), opt_number(sv.velocity));
    props.insert("heading".to_string(), JsonValue::from(sv.heading));
    props.insert("altitude".to_string(), opt_number(sv.baroaltitude));
    props.insert("entityId".to_string(), JsonValue::from(sv.entity_id()));
    props.insert("color".to_string(), JsonValue::from(color));

    feature(sv.entity_id(), Value::Point(sv.position().to_coords()), props)
}

/// Assemble the positions and trails sources for the current selection
pub fn build_frame(selection: &WindowSelection<'_>, trails: &TrailTracker, palette: &Palette) -> Frame {
    let mut positions = Vec::with_capacity(selection.len());
    let mut lines = Vec::new();

    for (&id, sv) in &selection.latest {
        let color = palette.color_for(id);
        positions.push(position_feature(sv, color));

        if let Some(trail) = trails.get(id) {
            if trail.len() >= 2 {
                let coords = trail.points().map(|p| p.position.to_coords()).collect();
                let mut props = JsonObject::new();
                props.insert("entityId".to_string(), JsonValue::from(id));
                props.insert("color".to_string(), JsonValue::from(color));
                lines.push(feature(id, Value::LineString(coords), props));
            }
        }
    }

    Frame {
        positions: feature_collection(positions),
        trails: feature_collection(lines),
    }
}

/// Whatever presents the frames (map, file sink, test recorder)
pub trait RenderSurface {
    fn replace_sources(&mut self, frame: Frame) -> Result<(), SurfaceError>;
}

/// Keeps the last frame in memory
#[derive(Debug, Clone)]
pub struct MemorySurface {
    pub current: Frame,
    pub updates: usize,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self { current: Frame::empty(), updates: 0 }
    }
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface for MemorySurface {
    fn replace_sources(&mut self, frame: Frame) -> Result<(), SurfaceError> {
        self.current = frame;
        self.updates += 1;
        Ok(())
    }
}

/// Writes `positions.geojson` and `trails.geojson` into a directory.
/// Each file is written to a temp sibling and renamed so readers never see a partial file.
/// Both temp files are written before either rename. The pair is still not atomic: a reader
/// polling between the two renames sees this tick's positions with the previous tick's trails.
#[derive(Debug, Clone)]
pub struct GeoJsonDirSurface {
    dir: PathBuf,
}

impl GeoJsonDirSurface {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SurfaceError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn source_path(&self, source: &str) -> PathBuf {
        self.dir.join(format!("{}.geojson", source))
    }

    fn temp_path(&self, source: &str) -> PathBuf {
        self.source_path(source).with_extension("geojson.tmp")
    }

    fn stage_source(&self, source: &str, fc: &FeatureCollection) -> Result<(), SurfaceError> {
        std::fs::write(self.temp_path(source), serde_json::to_vec(fc)?)?;
        Ok(())
    }

    fn commit_source(&self, source: &str) -> Result<(), SurfaceError> {
        std::fs::rename(self.temp_path(source), self.source_path(source))?;
        Ok(())
    }
}

impl RenderSurface for GeoJsonDirSurface {
    fn replace_sources(&mut self, frame: Frame) -> Result<(), SurfaceError> {
        self.stage_source(POSITIONS_SOURCE, &frame.positions)?;
        self.stage_source(TRAILS_SOURCE, &frame.trails)?;

        self.commit_source(POSITIONS_SOURCE)?;
        self.commit_source(TRAILS_SOURCE)
    }
}
