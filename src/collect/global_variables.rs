use std::path::PathBuf;

/// Directory the web application reads its data artifacts from.
pub const DATA_PATH: &str = "./data";

/// Default location of the IECC climate zone shapefile.
pub const CLIMATE_ZONE_SHAPEFILE: &str = "ClimateZoneDataFiles/ClimateZones.shp";

/// Attribute column holding the IECC climate zone code ("3A", "4C", ...).
pub const ZONE_FIELD: &str = "IECC21";

/// Environment variable the EIA API key is read from.
pub const EIA_API_KEY_VAR: &str = "EIA_API_KEY";

pub fn get_data_path() -> PathBuf {
    PathBuf::from(DATA_PATH)
}
