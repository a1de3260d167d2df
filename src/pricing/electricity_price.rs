use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::collect::eia::eia_collect::{EiaCollect, EiaConfig};
use crate::collect::global_variables::DATA_PATH;
use crate::commons::basic_functions::ensure_dir;

/// CSV header, in column order.
const CSV_HEADER: [&str; 4] = ["State", "StateID", "Period", "Price (cents/kWh)"];

/// One row of the electricity price report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "StateID")]
    pub state_id: String,
    #[serde(rename = "Period")]
    pub period: String,
    #[serde(rename = "Price (cents/kWh)")]
    pub price: f64,
}

/// Electricity price report structure.
/// Fetches residential retail prices from the EIA API, keeps the 50 states
/// plus DC sorted by price descending, appends the national average, and
/// writes the CSV the web application charts from.
pub struct ElectricityPrices {
    collect: EiaCollect,
    output_path: PathBuf,
    records: Vec<PriceRecord>,
    us_average: Option<PriceRecord>,
}

impl ElectricityPrices {
    pub fn new(config: EiaConfig, output_path: Option<String>) -> Result<Self> {
        let output_path = PathBuf::from(output_path.as_deref().unwrap_or(DATA_PATH));
        Ok(ElectricityPrices {
            collect: EiaCollect::new(config),
            output_path,
            records: Vec::new(),
            us_average: None,
        })
    }

    /// Run the fetch: one API request, then filter and sort the payload.
    pub fn run(mut self) -> Result<Self> {
        self.collect.execute()?;
        self.process()?;
        Ok(self)
    }

    /// Filter and sort the already-collected payload.
    fn process(&mut self) -> Result<()> {
        let (mut records, us_average) = {
            let rows = self.collect.data_rows()?;
            partition_rows(rows)
        };

        // Highest price first; the API's own ordering is by state code
        records.sort_by(|a, b| b.price.partial_cmp(&a.price).unwrap_or(Ordering::Equal));

        if us_average.is_none() {
            println!("Warning: no U.S. average record (stateid \"US\") in API response");
        }

        self.records = records;
        self.us_average = us_average;
        Ok(())
    }

    /// State rows, sorted by price descending.
    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    /// The synthetic national average row, when the payload carried one.
    pub fn us_average(&self) -> Option<&PriceRecord> {
        self.us_average.as_ref()
    }

    /// Write the CSV report: header, state rows, then the U.S. average.
    pub fn to_csv(&self, name: Option<&str>) -> Result<PathBuf> {
        let name = name.unwrap_or("electricity_prices");
        ensure_dir(&self.output_path)?;

        let path = self.output_path.join(format!("{}.csv", name));
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

        writer.write_record(CSV_HEADER)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        if let Some(average) = &self.us_average {
            writer.serialize(average)?;
        }
        writer.flush()?;

        println!("Electricity prices saved to {}", path.display());
        println!("Found data for {} states/territories", self.records.len());

        Ok(path)
    }

    /// Get output path
    pub fn get_output_path(&self) -> &Path {
        &self.output_path
    }
}

/// Split API rows into state records and the national average.
/// Rows missing any expected field are skipped; multi-state aggregates
/// (3-letter region codes like "NEW") are discarded.
fn partition_rows(rows: &[Value]) -> (Vec<PriceRecord>, Option<PriceRecord>) {
    let mut records = Vec::new();
    let mut us_average = None;

    for row in rows {
        let Some(record) = parse_price_record(row) else {
            continue;
        };
        if is_state_code(&record.state_id) {
            records.push(record);
        } else if record.state_id == "US" && us_average.is_none() {
            us_average = Some(PriceRecord {
                state: "U.S. Average".to_string(),
                ..record
            });
        }
    }

    (records, us_average)
}

/// 2-letter state codes minus the "US" aggregate, plus the District of
/// Columbia.
fn is_state_code(id: &str) -> bool {
    (id.len() == 2 && id != "US") || id == "DC"
}

fn parse_price_record(row: &Value) -> Option<PriceRecord> {
    Some(PriceRecord {
        state: row.get("stateDescription")?.as_str()?.to_string(),
        state_id: row.get("stateid")?.as_str()?.to_string(),
        period: period_value(row.get("period")?)?,
        price: price_value(row.get("price")?)?,
    })
}

/// Periods arrive as "2023" or 2023 depending on the endpoint version.
fn period_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Prices arrive as JSON numbers or numeric strings.
fn price_value(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(state: &str, id: &str, period: &str, price: Value) -> Value {
        json!({
            "stateDescription": state,
            "stateid": id,
            "period": period,
            "price": price,
        })
    }

    fn prices_with_payload(rows: Vec<Value>, output: &Path) -> ElectricityPrices {
        let mut prices = ElectricityPrices::new(
            EiaConfig::new("test-key"),
            Some(output.to_string_lossy().to_string()),
        )
        .unwrap();
        prices.collect.content = Some(json!({ "response": { "data": rows } }));
        prices
    }

    #[test]
    fn test_filter_keeps_states_and_dc_only() {
        let tmp = tempfile::tempdir().unwrap();
        let mut prices = prices_with_payload(
            vec![
                row("California", "CA", "2023", json!(29.49)),
                row("District of Columbia", "DC", "2023", json!(17.54)),
                row("New England", "NEW", "2023", json!(27.18)),
                row("U.S. Total", "US", "2023", json!(16.88)),
            ],
            tmp.path(),
        );
        prices.process().unwrap();

        let ids: Vec<&str> = prices.records().iter().map(|r| r.state_id.as_str()).collect();
        assert_eq!(ids, vec!["CA", "DC"]);
        assert_eq!(prices.us_average().unwrap().state, "U.S. Average");
    }

    #[test]
    fn test_records_sorted_by_price_descending() {
        let tmp = tempfile::tempdir().unwrap();
        let mut prices = prices_with_payload(
            vec![
                row("Texas", "TX", "2023", json!(14.55)),
                row("Hawaii", "HI", "2023", json!(42.33)),
                row("Idaho", "ID", "2023", json!(11.02)),
            ],
            tmp.path(),
        );
        prices.process().unwrap();

        let values: Vec<f64> = prices.records().iter().map(|r| r.price).collect();
        assert!(values.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(prices.records()[0].state_id, "HI");
    }

    #[test]
    fn test_string_prices_and_skipped_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let mut prices = prices_with_payload(
            vec![
                row("Vermont", "VT", "2023", json!("21.40")),
                json!({ "stateid": "NH", "period": "2023" }), // price missing
            ],
            tmp.path(),
        );
        prices.process().unwrap();

        assert_eq!(prices.records().len(), 1);
        assert_eq!(prices.records()[0].price, 21.40);
    }

    #[test]
    fn test_missing_us_record_is_warning_only() {
        let tmp = tempfile::tempdir().unwrap();
        let mut prices =
            prices_with_payload(vec![row("Ohio", "OH", "2023", json!(15.0))], tmp.path());
        prices.process().unwrap();
        assert!(prices.us_average().is_none());
        // CSV still gets written, just without the average row
        prices.to_csv(None).unwrap();
    }

    #[test]
    fn test_missing_data_path_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut prices = ElectricityPrices::new(
            EiaConfig::new("test-key"),
            Some(tmp.path().to_string_lossy().to_string()),
        )
        .unwrap();
        prices.collect.content = Some(json!({ "error": "bad request" }));
        assert!(prices.process().is_err());
    }

    #[test]
    fn test_csv_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("data");
        let mut prices = prices_with_payload(
            vec![
                row("California", "CA", "2023", json!(0.30)),
                row("Texas", "TX", "2023", json!(0.12)),
                row("United States", "US", "2023", json!(0.17)),
            ],
            &out,
        );
        prices.process().unwrap();
        let path = prices.to_csv(None).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "State,StateID,Period,Price (cents/kWh)");
        assert_eq!(lines[1], "California,CA,2023,0.3");
        assert_eq!(lines[2], "Texas,TX,2023,0.12");
        assert_eq!(lines[3], "U.S. Average,US,2023,0.17");
        assert_eq!(lines.len(), 4);
    }
}
