use crate::prelude::*;
use geo_types::{LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("unexpected level={0}, shape sources exist for level 0 (country) and level 1 (state/province)")]
    UnsupportedLevel(u8),
}

/// Geometry resource and candidate-name attribute keys for one granularity
/// level. Sub-division data exists in the dataset but has no shape source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSpec {
    pub resource: &'static str,
    pub attribute_keys: &'static [&'static str],
}

impl LevelSpec {
    pub fn for_level(level: u8) -> Result<Self, ShapeError> {
        match level {
            0 => Ok(Self {
                resource: "ne_10m_admin_0_countries",
                attribute_keys: &["NAME_SORT", "SOVEREIGNT"],
            }),
            1 => Ok(Self {
                resource: "ne_10m_admin_1_states_provinces",
                attribute_keys: &["name", "admin"],
            }),
            level => Err(ShapeError::UnsupportedLevel(level)),
        }
    }

    /// The attribute reported by automated discovery.
    pub fn primary_key(&self) -> &'static str {
        self.attribute_keys[0]
    }
}

/// One named geometry: string attributes plus polygon fragments.
#[derive(Debug, Clone)]
pub struct ShapeRecord {
    attributes: BTreeMap<String, String>,
    geometry: MultiPolygon<f64>,
}

impl ShapeRecord {
    pub fn new(attributes: BTreeMap<String, String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            attributes,
            geometry,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// The disjoint polygons making up this shape, in drawing units.
    pub fn fragments(&self) -> &[Polygon<f64>] {
        &self.geometry.0
    }
}

/// Reads per-level GeoJSON exports out of a shape folder.
pub struct ShapeSource {
    folder: PathBuf,
}

impl ShapeSource {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn load_level(&self, level: u8) -> Result<(LevelSpec, Vec<ShapeRecord>)> {
        let level_spec = LevelSpec::for_level(level)?;
        let path = self.folder.join(format!("{}.geojson", level_spec.resource));
        let file = File::open(&path)
            .with_context(|| format!("failed to open shape resource {}", path.display()))?;
        let records = read_feature_collection(io::BufReader::new(file))?;
        tracing::info!("loaded {} shapes from {}", records.len(), path.display());
        Ok((level_spec, records))
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: BTreeMap<String, serde_json::Value>,
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    #[serde(other)]
    Unsupported,
}

pub fn read_feature_collection<R: io::Read>(reader: R) -> Result<Vec<ShapeRecord>> {
    let collection: FeatureCollection =
        serde_json::from_reader(reader).context("malformed GeoJSON feature collection")?;

    let mut records = Vec::new();
    for feature in collection.features {
        let polygons = match feature.geometry {
            Some(Geometry::Polygon { coordinates }) => {
                rings_to_polygon(coordinates).into_iter().collect()
            }
            Some(Geometry::MultiPolygon { coordinates }) => coordinates
                .into_iter()
                .filter_map(rings_to_polygon)
                .collect(),
            Some(Geometry::Unsupported) | None => Vec::new(),
        };
        if polygons.is_empty() {
            continue;
        }

        // Only string-valued properties can carry candidate names.
        let attributes = feature
            .properties
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::String(text) => Some((key, text)),
                _ => None,
            })
            .collect();
        records.push(ShapeRecord::new(attributes, MultiPolygon::new(polygons)));
    }
    Ok(records)
}

fn rings_to_polygon(mut rings: Vec<Vec<Vec<f64>>>) -> Option<Polygon<f64>> {
    if rings.is_empty() {
        return None;
    }
    let exterior = ring_to_line_string(rings.remove(0));
    if exterior.0.len() < 3 {
        return None;
    }
    let interiors = rings.into_iter().map(ring_to_line_string).collect();
    Some(Polygon::new(exterior, interiors))
}

fn ring_to_line_string(ring: Vec<Vec<f64>>) -> LineString<f64> {
    LineString::from(
        ring.into_iter()
            .filter(|position| position.len() >= 2)
            .map(|position| (position[0], position[1]))
            .collect::<Vec<_>>(),
    )
}
