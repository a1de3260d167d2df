pub mod collect;
pub mod commons;
pub mod geo_core;
pub mod geometric;
pub mod pricing;
