pub mod climate_zone;
pub mod zone_info;
