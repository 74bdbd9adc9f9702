use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::asset::AssetId;
use crate::core::error::UpstreamError;
use crate::core::price::{PriceProvider, PriceSnapshot};

/// CoinGeckoProvider implementation for PriceProvider.
///
/// One `/simple/price` call covers the whole asset set; the request timeout
/// must stay below the monitor's poll period so a slow upstream delays at
/// most one cycle.
pub struct CoinGeckoProvider {
    base_url: String,
    quote: String,
    timeout: Duration,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, quote: &str, timeout: Duration) -> Self {
        CoinGeckoProvider {
            base_url: base_url.to_string(),
            quote: quote.trim().to_lowercase(),
            timeout,
        }
    }
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    #[instrument(
        name = "CoinGeckoFetch",
        skip(self, ids),
        fields(assets = ids.len())
    )]
    async fn fetch_prices(&self, ids: &BTreeSet<AssetId>) -> Result<PriceSnapshot, UpstreamError> {
        let joined = ids
            .iter()
            .map(AssetId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/simple/price", self.base_url);
        debug!("Requesting prices from {} for {}", url, joined);

        let client = reqwest::Client::builder()
            .user_agent("pricewatch/0.1")
            .timeout(self.timeout)
            .build()
            .map_err(|e| UpstreamError::Request(e.to_string()))?;

        let response = client
            .get(&url)
            .query(&[("ids", joined.as_str()), ("vs_currencies", self.quote.as_str())])
            .send()
            .await
            .map_err(|e| UpstreamError::Request(format!("{e} for URL: {url}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Request(e.to_string()))?;
        let data: HashMap<String, HashMap<String, f64>> =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Payload(e.to_string()))?;

        // An id absent from the response, or present without our quote
        // currency, has no data and stays out of the snapshot.
        let mut prices = BTreeMap::new();
        for (raw_id, quotes) in data {
            if let Some(price) = quotes.get(&self.quote) {
                prices.insert(AssetId::new(&raw_id), *price);
            }
        }

        debug!(returned = prices.len(), requested = ids.len(), "prices fetched");
        Ok(PriceSnapshot::new(prices, Utc::now()))
    }
}
