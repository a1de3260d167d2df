use anyhow::Result;
use powermap::collect::eia::eia_collect::EiaConfig;
use powermap::pricing::electricity_price::ElectricityPrices;

/// Fetch residential electricity prices from the EIA API and write the
/// sorted CSV report for the web map. The API key comes from EIA_API_KEY.
fn main() -> Result<()> {
    let config = EiaConfig::from_env()?;

    let prices = ElectricityPrices::new(config, None)?.run()?;
    prices.to_csv(Some("electricity_prices"))?;

    Ok(())
}
