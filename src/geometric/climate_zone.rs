use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon, SimplifyVwPreserve};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry};
use serde_json::{Map, Value};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{PolygonRing, Reader, Shape};

use crate::collect::global_variables::{CLIMATE_ZONE_SHAPEFILE, DATA_PATH, ZONE_FIELD};
use crate::commons::basic_functions::{ensure_dir, file_size_mb};
use crate::geo_core::{self, GeoCore, WGS84};
use crate::geometric::zone_info::ZoneInfo;

/// IECC climate zone structure.
/// Reads the climate zone shapefile, reprojects it to WGS84 for web mapping,
/// optionally simplifies the boundaries, and writes the GeoJSON plus the
/// zone color lookup the web application consumes.
pub struct ClimateZone {
    /// Path to the input shapefile (sidecar .dbf/.shx expected next to it)
    filepath_shp: PathBuf,
    /// Output directory for the GeoJSON and zone info artifacts
    output_path: PathBuf,
    /// GeoCore holding the source CRS
    pub geo_core: GeoCore,
    /// CRS override when the .prj sidecar is missing or wrong
    set_crs: Option<i32>,
    /// Simplification tolerance; larger values mean smaller, coarser output
    tolerance: Option<f64>,
    /// Geometry + attributes per input feature, in file order
    features: Vec<(MultiPolygon<f64>, Map<String, Value>)>,
    /// Assembled GeoJSON (after run)
    geojson: Option<GeoJson>,
}

impl ClimateZone {
    /// Create a new ClimateZone converter.
    /// Paths default to the repository layout the web app expects.
    pub fn new(
        filepath_shp: Option<String>,
        output_path: Option<String>,
        set_crs: Option<i32>,
    ) -> Result<Self> {
        let filepath_shp = PathBuf::from(
            filepath_shp
                .as_deref()
                .unwrap_or(CLIMATE_ZONE_SHAPEFILE),
        );
        let output_path = PathBuf::from(output_path.as_deref().unwrap_or(DATA_PATH));

        Ok(ClimateZone {
            filepath_shp,
            output_path,
            geo_core: GeoCore::default(),
            set_crs,
            tolerance: None,
            features: Vec::new(),
            geojson: None,
        })
    }

    /// Set the simplification tolerance (topology-preserving
    /// Visvalingam-Whyatt; the epsilon is an area in squared CRS units).
    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = Some(tolerance);
    }

    /// Run the conversion: read all features, reproject to WGS84 when the
    /// source CRS differs, simplify when a tolerance is set, and assemble the
    /// GeoJSON FeatureCollection. Feature count is preserved throughout.
    pub fn run(mut self) -> Result<Self> {
        println!("Reading shapefile from {}", self.filepath_shp.display());
        let items = read_shapefile(&self.filepath_shp)?;
        println!("Shapefile contains {} features", items.len());

        if let Some((_, record)) = items.first() {
            let columns: Vec<String> = record.clone().into_iter().map(|(name, _)| name).collect();
            println!("Columns: {:?}", columns);
        }

        let source_epsg = self.resolve_source_epsg()?;
        self.geo_core.set_epsg(source_epsg);
        if source_epsg != WGS84 {
            println!("Converting CRS from EPSG:{} to EPSG:4326 (WGS84)", source_epsg);
        }

        if let Some(tolerance) = self.tolerance {
            println!("Simplifying geometries with tolerance {}", tolerance);
        }

        let mut features = Vec::with_capacity(items.len());
        for (shape, record) in items {
            let mut geometry = shape_to_multi_polygon(shape)?;
            geometry = GeoCore::reproject_multi_polygon(source_epsg, WGS84, &geometry)?;
            if let Some(tolerance) = self.tolerance {
                geometry = geometry.simplify_vw_preserve(&tolerance);
            }
            features.push((geometry, record_to_properties(record)));
        }

        let collection = FeatureCollection {
            bbox: None,
            foreign_members: None,
            features: features
                .iter()
                .map(|(geometry, properties)| Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(geojson::Value::from(geometry))),
                    id: None,
                    properties: Some(properties.clone()),
                    foreign_members: None,
                })
                .collect(),
        };

        self.features = features;
        self.geojson = Some(GeoJson::from(collection));

        Ok(self)
    }

    /// Source CRS: explicit override first, then the .prj sidecar, then WGS84.
    /// An unrecognized projected CRS is fatal: reprojecting from the wrong
    /// reference would silently place every zone in the wrong spot.
    fn resolve_source_epsg(&self) -> Result<i32> {
        if let Some(epsg) = self.set_crs {
            return Ok(epsg);
        }

        let prj_path = self.filepath_shp.with_extension("prj");
        if !prj_path.exists() {
            println!("No .prj sidecar found, assuming EPSG:4326 (WGS84)");
            return Ok(WGS84);
        }

        let wkt = std::fs::read_to_string(&prj_path)
            .with_context(|| format!("Failed to read projection file: {}", prj_path.display()))?;
        match geo_core::epsg_from_prj(&wkt) {
            Some(epsg) => Ok(epsg),
            None if geo_core::is_projected_wkt(&wkt) => bail!(
                "Unrecognized projected CRS in {}; pass the EPSG code explicitly",
                prj_path.display()
            ),
            None => {
                println!("Unrecognized geographic CRS, assuming EPSG:4326 (WGS84)");
                Ok(WGS84)
            }
        }
    }

    /// Get the GeoJSON assembled by `run`
    pub fn get_geojson(&self) -> Option<&GeoJson> {
        self.geojson.as_ref()
    }

    /// Number of converted features
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Write the GeoJSON and the zone info artifact to the output directory.
    pub fn to_geojson(&self, name: Option<&str>) -> Result<PathBuf> {
        let geojson = self
            .geojson
            .as_ref()
            .context("No GeoJSON data available. Call run() first.")?;

        let name = name.unwrap_or("climate_zones");
        ensure_dir(&self.output_path)?;

        let output_file = self.output_path.join(format!("{}.geojson", name));
        println!("Saving GeoJSON to {}", output_file.display());
        std::fs::write(&output_file, geojson.to_string())
            .with_context(|| format!("Failed to write GeoJSON file: {}", output_file.display()))?;

        let size = file_size_mb(&output_file)?;
        println!("GeoJSON file created: {:.2} MB", size);

        self.write_zone_info()?;

        Ok(output_file)
    }

    /// Derive and write `zone_info.json` from the zone attribute column.
    /// A missing column is a warning, not a failure.
    pub fn write_zone_info(&self) -> Result<()> {
        match self.zone_column_values() {
            Some(values) => {
                let info = ZoneInfo::generate(values);
                info.to_file(&self.output_path.join("zone_info.json"))
            }
            None => {
                println!("Warning: {} column not found in data", ZONE_FIELD);
                Ok(())
            }
        }
    }

    /// Values of the zone column, `None` when the column is absent entirely.
    /// Null and NaN attribute values become `None` entries.
    fn zone_column_values(&self) -> Option<Vec<Option<String>>> {
        let present = self
            .features
            .iter()
            .any(|(_, properties)| properties.contains_key(ZONE_FIELD));
        if !present {
            return None;
        }

        Some(
            self.features
                .iter()
                .map(|(_, properties)| match properties.get(ZONE_FIELD) {
                    Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    Some(Value::Number(n)) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        )
    }

    /// Get output path
    pub fn get_output_path(&self) -> &Path {
        &self.output_path
    }
}

/// Read all shapes + attribute records from a `.shp` path.
/// Fails when the file or its sidecar components are missing or corrupt.
pub fn read_shapefile(path: &Path) -> Result<Vec<(Shape, Record)>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open shapefile: {}", path.display()))?;

    let mut items = Vec::with_capacity(reader.shape_count()?);
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.context("Error reading shape and record")?;
        items.push((shape, record));
    }
    Ok(items)
}

/// Convert a shapefile shape to a geo MultiPolygon.
/// Shapefile ring order is outer ring followed by its holes; Z/M coordinates
/// are dropped.
pub fn shape_to_multi_polygon(shape: Shape) -> Result<MultiPolygon<f64>> {
    match shape {
        Shape::Polygon(p) => Ok(rings_to_multi_polygon(
            p.rings()
                .iter()
                .map(|ring| {
                    let coords = ring
                        .points()
                        .iter()
                        .map(|pt| Coord { x: pt.x, y: pt.y })
                        .collect::<Vec<_>>();
                    (coords, matches!(ring, PolygonRing::Outer(_)))
                })
                .collect(),
        )),
        Shape::PolygonZ(p) => Ok(rings_to_multi_polygon(
            p.rings()
                .iter()
                .map(|ring| {
                    let coords = ring
                        .points()
                        .iter()
                        .map(|pt| Coord { x: pt.x, y: pt.y })
                        .collect::<Vec<_>>();
                    (coords, matches!(ring, PolygonRing::Outer(_)))
                })
                .collect(),
        )),
        other => bail!(
            "Unsupported shape type in climate zone file: {:?}",
            other.shapetype()
        ),
    }
}

/// Group rings into polygons: each outer ring collects the holes that follow
/// it. geo closes rings on construction.
fn rings_to_multi_polygon(rings: Vec<(Vec<Coord<f64>>, bool)>) -> MultiPolygon<f64> {
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes: Vec<LineString<f64>> = Vec::new();

    for (coords, is_outer) in rings {
        let ring = LineString(coords);
        if is_outer {
            if let Some(ext) = exterior.take() {
                polygons.push(Polygon::new(ext, std::mem::take(&mut holes)));
            }
            exterior = Some(ring);
        } else {
            holes.push(ring);
        }
    }
    if let Some(ext) = exterior {
        polygons.push(Polygon::new(ext, holes));
    }

    MultiPolygon(polygons)
}

/// Convert a dbase record into GeoJSON feature properties.
/// NaN numeric values are normalized to JSON null instead of failing
/// serialization.
fn record_to_properties(record: Record) -> Map<String, Value> {
    let mut properties = Map::new();
    for (name, value) in record {
        properties.insert(name, field_value_to_json(value));
    }
    properties
}

fn field_value_to_json(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(Some(s)) => Value::String(s),
        FieldValue::Numeric(Some(f)) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Float(Some(f)) => serde_json::Number::from_f64(f as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Integer(i) => Value::Number(i.into()),
        FieldValue::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Logical(Some(b)) => Value::Bool(b),
        FieldValue::Date(Some(date)) => Value::String(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        _ => Value::Null,
    }
}
