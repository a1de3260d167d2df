use anyhow::{bail, Context, Result};
use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

/// EPSG code of the WGS84 lon/lat reference used by web maps.
pub const WGS84: i32 = 4326;

/// Base struct for geospatial operations.
/// Holds the CRS (Coordinate Reference System) a dataset's coordinates are
/// expressed in and provides transforms towards other references.
#[derive(Debug, Clone, Copy)]
pub struct GeoCore {
    /// EPSG code
    pub epsg: i32,
}

impl GeoCore {
    /// Create a new GeoCore with EPSG
    pub fn new(epsg: i32) -> Self {
        GeoCore { epsg }
    }

    /// Get EPSG code
    pub fn get_epsg(&self) -> i32 {
        self.epsg
    }

    /// Set EPSG code
    pub fn set_epsg(&mut self, epsg: i32) {
        self.epsg = epsg;
    }

    /// Transform a coordinate pair from one CRS to another.
    /// Same source and target EPSG is a no-op.
    pub fn transform_coords(from_epsg: i32, to_epsg: i32, x: f64, y: f64) -> Result<(f64, f64)> {
        if from_epsg == to_epsg {
            return Ok((x, y));
        }

        let from = proj_for(from_epsg)?;
        let to = proj_for(to_epsg)?;

        // proj4rs wants radians for geographic CRS, meters otherwise.
        let mut point = if from.is_latlong() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        transform(&from, &to, &mut point).context("Failed to transform coordinates")?;

        if to.is_latlong() {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }

    /// Reproject every coordinate of a MultiPolygon from one CRS to another.
    /// Builds the projections once and maps them over all rings.
    pub fn reproject_multi_polygon(
        from_epsg: i32,
        to_epsg: i32,
        shape: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>> {
        if from_epsg == to_epsg {
            return Ok(shape.clone());
        }

        let from = proj_for(from_epsg)?;
        let to = proj_for(to_epsg)?;
        let from_latlong = from.is_latlong();
        let to_latlong = to.is_latlong();

        shape.try_map_coords(|coord: Coord<f64>| {
            let mut point = if from_latlong {
                (coord.x.to_radians(), coord.y.to_radians(), 0.0)
            } else {
                (coord.x, coord.y, 0.0)
            };
            transform(&from, &to, &mut point).context("Failed to transform coordinates")?;
            if to_latlong {
                Ok(Coord {
                    x: point.0.to_degrees(),
                    y: point.1.to_degrees(),
                })
            } else {
                Ok(Coord {
                    x: point.0,
                    y: point.1,
                })
            }
        })
    }
}

impl Default for GeoCore {
    fn default() -> Self {
        GeoCore::new(WGS84)
    }
}

/// Build a proj4rs projection for a known EPSG code.
fn proj_for(epsg: i32) -> Result<Proj> {
    let definition = proj_definition(epsg)?;
    Proj::from_proj_string(definition)
        .with_context(|| format!("Failed to build projection for EPSG:{}", epsg))
}

/// PROJ.4 definition strings for the CRS this crate can read from.
fn proj_definition(epsg: i32) -> Result<&'static str> {
    match epsg {
        // WGS84 lon/lat
        4326 => Ok("+proj=longlat +datum=WGS84 +no_defs +type=crs"),
        // NAD83 lon/lat (common for US federal datasets)
        4269 => Ok("+proj=longlat +datum=NAD83 +no_defs +type=crs"),
        // Web Mercator
        3857 => Ok(
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +no_defs +type=crs",
        ),
        // NAD83 / CONUS Albers equal-area
        5070 => Ok(
            "+proj=aea +lat_0=23 +lon_0=-96 +lat_1=29.5 +lat_2=45.5 +x_0=0 +y_0=0 +datum=NAD83 +units=m +no_defs +type=crs",
        ),
        _ => bail!("No PROJ.4 definition registered for EPSG:{}", epsg),
    }
}

/// Guess the EPSG code from the WKT text of a `.prj` sidecar file.
/// Shapefile sidecars carry free-form ESRI WKT, so this is a signature match
/// over the handful of references US climate datasets actually ship in.
pub fn epsg_from_prj(wkt: &str) -> Option<i32> {
    let upper = wkt.to_ascii_uppercase();

    // Projected references first: their WKT nests a geographic CRS name,
    // so the datum checks below would otherwise shadow them.
    if upper.contains("WEB_MERCATOR") || upper.contains("PSEUDO-MERCATOR") {
        return Some(3857);
    }
    if upper.contains("ALBERS") {
        return Some(5070);
    }
    if upper.contains("PROJCS") {
        return None; // projected, but not one we recognize
    }

    if upper.contains("NAD_1983") || upper.contains("NORTH_AMERICAN_1983") || upper.contains("NAD83")
    {
        return Some(4269);
    }
    if upper.contains("WGS_1984") || upper.contains("WGS 84") || upper.contains("WGS84") {
        return Some(4326);
    }
    None
}

/// Whether a `.prj` WKT describes a projected (non lon/lat) CRS.
pub fn is_projected_wkt(wkt: &str) -> bool {
    wkt.to_ascii_uppercase().contains("PROJCS")
}
