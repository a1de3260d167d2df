use std::env;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::collect::global_variables::EIA_API_KEY_VAR;

/// EIA v2 endpoint for retail electricity sales data.
const EIA_RETAIL_SALES_URL: &str = "https://api.eia.gov/v2/electricity/retail-sales/data";

/// Errors the EIA collector can report beyond plain transport failures.
#[derive(Debug, Error)]
pub enum EiaError {
    #[error("EIA API returned HTTP {status}")]
    Status { status: reqwest::StatusCode },
    /// The payload parsed as JSON but the `response.data` path is absent.
    /// Carries the raw payload so the operator can see what came back.
    #[error("No data found in EIA API response:\n{raw}")]
    MissingData { raw: String },
}

/// Query parameters for the retail-sales request.
/// The API key is injected (environment), never hardcoded.
#[derive(Debug, Clone)]
pub struct EiaConfig {
    pub api_key: String,
    /// Reporting year, used as both ends of the annual range.
    pub year: i32,
    /// EIA sector facet ("RES" for residential).
    pub sector: String,
    /// Maximum number of rows to request.
    pub length: u32,
}

impl EiaConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        EiaConfig {
            api_key: api_key.into(),
            year: 2023,
            sector: "RES".to_string(),
            length: 100,
        }
    }

    /// Read the API key from the `EIA_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var(EIA_API_KEY_VAR).with_context(|| {
            format!(
                "{} is not set; an EIA API key is required (https://www.eia.gov/opendata/)",
                EIA_API_KEY_VAR
            )
        })?;
        Ok(EiaConfig::new(api_key))
    }
}

/// Collector for the EIA retail-sales API.
/// Performs exactly one blocking GET per run and keeps the parsed payload.
pub struct EiaCollect {
    pub config: EiaConfig,
    pub content: Option<Value>,
}

impl EiaCollect {
    pub fn new(config: EiaConfig) -> Self {
        EiaCollect {
            config,
            content: None,
        }
    }

    /// Build the fixed retail-sales query:
    /// price data, residential sector facet, annual frequency over a single
    /// year, sorted by state code ascending.
    pub fn build_url(&self) -> Result<Url> {
        let mut url =
            Url::parse(EIA_RETAIL_SALES_URL).context("Failed to parse EIA API base URL")?;
        let year = self.config.year.to_string();
        url.query_pairs_mut()
            .append_pair("api_key", &self.config.api_key)
            .append_pair("data[]", "price")
            .append_pair("facets[sectorid][]", &self.config.sector)
            .append_pair("frequency", "annual")
            .append_pair("start", &year)
            .append_pair("end", &year)
            .append_pair("sort[0][column]", "stateid")
            .append_pair("sort[0][direction]", "asc")
            .append_pair("length", &self.config.length.to_string());
        Ok(url)
    }

    /// Perform the single GET request and store the parsed payload.
    /// No retry: a transport failure or non-success status ends the run.
    pub fn execute(&mut self) -> Result<()> {
        let url = self.build_url()?;
        println!("Requesting electricity prices from {}", EIA_RETAIL_SALES_URL);

        let client = Client::new();
        let response = client.get(url).send().context("EIA API request failed")?;
        if !response.status().is_success() {
            return Err(EiaError::Status {
                status: response.status(),
            }
            .into());
        }

        let payload: Value = response
            .json()
            .context("Failed to parse JSON response from EIA API")?;
        self.content = Some(payload);

        Ok(())
    }

    /// The rows under the `response.data` path of the stored payload.
    pub fn data_rows(&self) -> Result<&Vec<Value>> {
        let payload = self
            .content
            .as_ref()
            .context("No content received from EIA API. Call execute() first.")?;

        match payload
            .get("response")
            .and_then(|r| r.get("data"))
            .and_then(Value::as_array)
        {
            Some(rows) => Ok(rows),
            None => Err(EiaError::MissingData {
                raw: serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string()),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_url_query() {
        let collect = EiaCollect::new(EiaConfig::new("test-key"));
        let url = collect.build_url().unwrap();
        let query = url.query().unwrap();
        assert!(query.contains("api_key=test-key"));
        assert!(query.contains("frequency=annual"));
        assert!(query.contains("start=2023"));
        assert!(query.contains("end=2023"));
        assert!(query.contains("length=100"));
        // Bracketed parameter names survive percent-encoding
        assert!(query.contains("data%5B%5D=price"));
        assert!(query.contains("facets%5Bsectorid%5D%5B%5D=RES"));
        assert!(query.contains("sort%5B0%5D%5Bcolumn%5D=stateid"));
    }

    #[test]
    fn test_data_rows_present() {
        let mut collect = EiaCollect::new(EiaConfig::new("k"));
        collect.content = Some(json!({
            "response": { "data": [ { "stateid": "CA" } ] }
        }));
        let rows = collect.data_rows().unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_data_rows_missing_path_reports_raw_payload() {
        let mut collect = EiaCollect::new(EiaConfig::new("k"));
        collect.content = Some(json!({ "error": "invalid api key" }));
        let err = collect.data_rows().unwrap_err();
        let message = format!("{}", err);
        assert!(message.contains("No data found"));
        assert!(message.contains("invalid api key"));
    }

    #[test]
    fn test_data_rows_before_execute() {
        let collect = EiaCollect::new(EiaConfig::new("k"));
        assert!(collect.data_rows().is_err());
    }

    #[test]
    fn test_config_from_env() {
        env::set_var(EIA_API_KEY_VAR, "env-key");
        let config = EiaConfig::from_env().unwrap();
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.sector, "RES");
        env::remove_var(EIA_API_KEY_VAR);
    }
}
