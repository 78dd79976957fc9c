use crate::error::DataError;
use crate::workflow::Region;
use anyhow::{Context, Result};
use geo::{Contains, Geometry, MultiPolygon, Point};
use geojson::{Feature, GeoJson};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Country regions with their outlines, indexed by region id
pub struct Atlas {
    pub regions: Vec<Region>,
    /// Outline of `regions[i]`; empty when the feature had no polygon geometry
    pub shapes: Vec<MultiPolygon<f64>>,
    index: HashMap<String, usize>,
}

impl Atlas {
    pub fn new(regions: Vec<Region>, shapes: Vec<MultiPolygon<f64>>) -> Self {
        let index = regions
            .iter()
            .enumerate()
            .map(|(i, region)| (region.id.clone(), i))
            .collect();
        Self {
            regions,
            shapes,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Position of the region with this id
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Region whose outline contains the point
    pub fn region_at(&self, lon: f64, lat: f64) -> Option<usize> {
        let point = Point::new(lon, lat);
        self.shapes.iter().position(|shape| shape.contains(&point))
    }
}

/// Load the world countries GeoJSON file
pub fn load_world(path: &Path) -> Result<Atlas> {
    let mut bytes =
        fs::read(path).with_context(|| format!("Failed to read geography dataset: {:?}", path))?;
    let atlas = parse_world(&mut bytes)
        .with_context(|| format!("Failed to load geography dataset: {:?}", path))?;
    debug!(regions = atlas.len(), "geography dataset loaded");
    Ok(atlas)
}

/// Parse a FeatureCollection of countries.
///
/// Feature `i` becomes region id `"i"` with `iso_a3` as its location code and
/// `name_long` (else `name`, else the code) as its name. The buffer is used as
/// scratch space by the parser.
pub fn parse_world(bytes: &mut [u8]) -> Result<Atlas, DataError> {
    let geojson: GeoJson = simd_json::serde::from_slice(bytes)?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(DataError::NotACollection),
    };

    let (regions, shapes): (Vec<_>, Vec<_>) = collection
        .features
        .into_par_iter()
        .enumerate()
        .map(|(index, feature)| feature_to_region(index, feature))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .unzip();

    Ok(Atlas::new(regions, shapes))
}

fn feature_to_region(index: usize, feature: Feature) -> Result<(Region, MultiPolygon<f64>), DataError> {
    let text = |key: &str| {
        feature
            .property(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let location_code = text("iso_a3").ok_or(DataError::MissingProperty {
        index,
        key: "iso_a3",
    })?;
    let name = text("name_long")
        .or_else(|| text("name"))
        .unwrap_or_else(|| location_code.clone());

    let shape = match feature.geometry {
        Some(geometry) => match Geometry::<f64>::try_from(geometry.value)? {
            Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
            Geometry::MultiPolygon(multi) => multi,
            _ => {
                warn!(index, code = %location_code, "feature is not a polygon, it cannot be clicked");
                MultiPolygon::new(Vec::new())
            }
        },
        None => MultiPolygon::new(Vec::new()),
    };

    let region = Region {
        id: index.to_string(),
        location_code,
        name,
    };
    Ok((region, shape))
}
