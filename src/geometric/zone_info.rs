use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Base color palette keyed by leading zone digit, hot (1) to cold (8).
pub const BASE_PALETTE: [(&str, &str); 8] = [
    ("1", "#ffeda0"), // light yellow (hot)
    ("2", "#feb24c"), // orange
    ("3", "#f03b20"), // red-orange
    ("4", "#bd0026"), // red (mixed)
    ("5", "#98D8C8"), // light teal
    ("6", "#43A2CA"), // medium blue
    ("7", "#0868ac"), // deep blue
    ("8", "#253494"), // deep navy (cold)
];

/// Color assigned to zone labels without a recognized leading digit.
pub const FALLBACK_COLOR: &str = "#999999";

/// Zone lookup artifact for the web application: the distinct climate zone
/// labels present in the data plus a label-to-hex-color map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub zones: Vec<String>,
    pub colors: BTreeMap<String, String>,
}

impl ZoneInfo {
    /// Build the artifact from the raw zone column values.
    /// `None` entries (null or NaN attribute values) are dropped; the zone
    /// list comes out sorted and duplicate-free.
    pub fn generate<I, S>(values: I) -> ZoneInfo
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let zones: BTreeSet<String> = values.into_iter().flatten().map(Into::into).collect();

        // The full base palette is always present so the web app can color
        // plain-digit zones even when only suffixed labels occur in the data.
        let mut colors: BTreeMap<String, String> = BASE_PALETTE
            .iter()
            .map(|(digit, color)| (digit.to_string(), color.to_string()))
            .collect();

        for zone in &zones {
            let color = zone
                .chars()
                .next()
                .filter(|c| c.is_ascii_digit())
                .and_then(|digit| colors.get(digit.to_string().as_str()).cloned());
            match color {
                // Moisture suffixes (A/B/C) keep the base digit's color;
                // the consuming application applies the variant shading.
                Some(base) => colors.insert(zone.clone(), base),
                None => colors.insert(zone.clone(), FALLBACK_COLOR.to_string()),
            };
        }

        ZoneInfo {
            zones: zones.into_iter().collect(),
            colors,
        }
    }

    /// Serialize to pretty JSON, e.g. `data/zone_info.json`.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize zone info")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write zone info file: {}", path.display()))?;
        println!(
            "Generated zone information with {} unique zones",
            self.zones.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zones_sorted_and_distinct() {
        let info = ZoneInfo::generate(vec![
            Some("4C"),
            Some("3A"),
            None,
            Some("4C"),
            Some("1A"),
        ]);
        assert_eq!(info.zones, vec!["1A", "3A", "4C"]);
    }

    #[test]
    fn test_variant_inherits_base_color() {
        let info = ZoneInfo::generate(vec![Some("3A"), Some("3B"), Some("3C")]);
        assert_eq!(info.colors["3A"], info.colors["3"]);
        assert_eq!(info.colors["3B"], info.colors["3"]);
        assert_eq!(info.colors["3C"], "#f03b20");
    }

    #[test]
    fn test_unrecognized_label_gets_fallback() {
        let info = ZoneInfo::generate(vec![Some("Marine"), Some("9X")]);
        assert_eq!(info.colors["Marine"], FALLBACK_COLOR);
        assert_eq!(info.colors["9X"], FALLBACK_COLOR);
    }

    #[test]
    fn test_base_palette_always_present() {
        let info = ZoneInfo::generate(Vec::<Option<String>>::new());
        assert!(info.zones.is_empty());
        assert_eq!(info.colors.len(), 8);
        assert_eq!(info.colors["1"], "#ffeda0");
        assert_eq!(info.colors["8"], "#253494");
    }

    #[test]
    fn test_to_file_round_trip() {
        let info = ZoneInfo::generate(vec![Some("2A"), Some("5B")]);
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("zone_info.json");
        info.to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: ZoneInfo = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.zones, info.zones);
        assert_eq!(parsed.colors, info.colors);
    }
}
