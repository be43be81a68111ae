use std::fs::File;
use std::path::Path;

use geo::{Coord, LineString};
use geojson::{Feature, FeatureCollection, GeoJson, GeometryValue, JsonObject, Position};
use serde_json::Value;

use super::de::{flag_from_str, flag_from_value, id_from_feature, id_from_value};
use super::raw_types::FeedEdge;
use crate::{Error, loading::RoadGraphBuilder};

const ID_KEYS: [&str; 2] = ["id", "osmid"];
const FROM_KEYS: [&str; 2] = ["from", "u"];
const TO_KEYS: [&str; 2] = ["to", "v"];
const WEIGHT_KEYS: [&str; 2] = ["length", "weight"];

/// Parse a feature collection from its JSON text
pub fn parse_feature_collection(text: &str) -> Result<FeatureCollection, Error> {
    let document = text
        .parse::<GeoJson>()
        .map_err(|e| Error::DataFormat(format!("invalid GeoJSON document: {e}")))?;

    match document {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(_) => Err(Error::DataFormat(
            "expected a FeatureCollection, got a single Feature".to_string(),
        )),
        GeoJson::Geometry(_) => Err(Error::DataFormat(
            "expected a FeatureCollection, got a bare Geometry".to_string(),
        )),
    }
}

/// Feed point features as nodes and line features as edges into the builder
pub fn add_features(
    builder: &mut RoadGraphBuilder,
    collection: FeatureCollection,
) -> Result<(), Error> {
    for (idx, mut feature) in collection.features.into_iter().enumerate() {
        let geometry = feature
            .geometry
            .take()
            .ok_or_else(|| Error::DataFormat(format!("feature {idx} has no geometry")))?;

        match geometry.value {
            GeometryValue::Point { coordinates } => {
                add_point_feature(builder, idx, feature, &coordinates)?;
            }
            GeometryValue::LineString { coordinates } => {
                add_line_feature(builder, idx, feature, &coordinates)?;
            }
            other => {
                return Err(Error::DataFormat(format!(
                    "feature {idx} has unsupported geometry type '{}'",
                    other.type_name()
                )));
            }
        }
    }

    Ok(())
}

fn add_point_feature(
    builder: &mut RoadGraphBuilder,
    idx: usize,
    feature: Feature,
    position: &Position,
) -> Result<(), Error> {
    let properties = feature.properties.unwrap_or_default();
    let id = feature
        .id
        .and_then(id_from_feature)
        .or_else(|| lookup(&properties, &ID_KEYS).and_then(id_from_value))
        .ok_or_else(|| Error::DataFormat(format!("point feature {idx} has no node id")))?;

    let coord = coord_from_position(position).ok_or_else(|| {
        Error::DataFormat(format!("node '{id}' has missing or malformed coordinates"))
    })?;

    builder.add_node(id, coord.y, coord.x);
    Ok(())
}

fn add_line_feature(
    builder: &mut RoadGraphBuilder,
    idx: usize,
    feature: Feature,
    positions: &[Position],
) -> Result<(), Error> {
    let properties = feature.properties.unwrap_or_default();

    let from = lookup(&properties, &FROM_KEYS)
        .and_then(id_from_value)
        .ok_or_else(|| Error::DataFormat(format!("edge feature {idx} has no 'from' node")))?;
    let to = lookup(&properties, &TO_KEYS)
        .and_then(id_from_value)
        .ok_or_else(|| Error::DataFormat(format!("edge feature {idx} has no 'to' node")))?;

    let weight = match lookup(&properties, &WEIGHT_KEYS) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_f64().ok_or_else(|| {
            Error::DataFormat(format!("edge {from}->{to} has a non-numeric weight"))
        })?),
    };

    let oneway = match properties.get("oneway") {
        None => false,
        Some(value) => flag_from_value(value).ok_or_else(|| {
            Error::DataFormat(format!("edge {from}->{to} has an unreadable oneway flag"))
        })?,
    };

    let coords = positions
        .iter()
        .map(coord_from_position)
        .collect::<Option<Vec<_>>>()
        .filter(|coords| coords.len() >= 2)
        .ok_or_else(|| {
            Error::DataFormat(format!("edge {from}->{to} has malformed line coordinates"))
        })?;

    builder.add_edge_with_geometry(from, to, weight, oneway, Some(LineString::new(coords)));
    Ok(())
}

fn lookup<'a>(properties: &'a JsonObject, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| properties.get(*key))
}

/// `[lon, lat]`; altitude and further members are ignored
fn coord_from_position(position: &Position) -> Option<Coord<f64>> {
    match position.as_slice() {
        [x, y, ..] if x.is_finite() && y.is_finite() => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

/// Read a CSV edge list (`from,to,weight,oneway`) into the builder.
/// Unlike feature parsing, every row must be readable.
pub fn add_edge_list(builder: &mut RoadGraphBuilder, path: &Path) -> Result<(), Error> {
    let file = File::open(path).map_err(|e| {
        Error::DataFormat(format!("failed to open edge list '{}': {e}", path.display()))
    })?;

    for (idx, record) in csv::Reader::from_reader(file)
        .deserialize::<FeedEdge>()
        .enumerate()
    {
        // 1-based file line, counting the header
        let row = idx + 2;
        let record = record.map_err(|e| {
            Error::DataFormat(format!("edge list '{}' row {row}: {e}", path.display()))
        })?;

        if record.from.trim().is_empty() || record.to.trim().is_empty() {
            return Err(Error::DataFormat(format!(
                "edge list row {row} is missing an endpoint"
            )));
        }

        let weight = match record.weight.trim() {
            "" => None,
            raw => Some(raw.parse::<f64>().map_err(|_| {
                Error::DataFormat(format!("edge list row {row} has weight '{raw}'"))
            })?),
        };
        let oneway = flag_from_str(&record.oneway).ok_or_else(|| {
            Error::DataFormat(format!(
                "edge list row {row} has oneway flag '{}'",
                record.oneway
            ))
        })?;

        builder.add_edge(record.from.trim(), record.to.trim(), weight, oneway);
    }

    Ok(())
}
