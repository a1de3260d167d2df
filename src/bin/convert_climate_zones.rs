use anyhow::Result;
use powermap::geometric::climate_zone::ClimateZone;

/// Convert the IECC climate zone shapefile to GeoJSON for the web map.
/// Simplifies boundaries for web performance and writes the zone color
/// lookup alongside.
fn main() -> Result<()> {
    let mut converter = ClimateZone::new(None, None, None)?;

    // 0.001 degrees is roughly 100 m; adjust for precision vs file size
    converter.set_tolerance(0.001);

    let converter = converter.run()?;
    converter.to_geojson(Some("climate_zones"))?;

    Ok(())
}
