//! AWS Price List feed client
//!
//! Resolves `PriceQuery` values against the public bulk offer files at
//! `pricing.us-east-1.amazonaws.com`. One offer file covers a whole
//! (service, region) pair, so downloaded documents are held in memory for the
//! life of the client and shared across queries — an analysis of a template
//! with ten EC2 instances downloads the EC2 offer file once.
//!
//! All calls are bounded by a request timeout, and transient transport
//! failures are retried with exponential backoff. A timeout or an unmatched
//! query surfaces as a per-query pricing error; it never hangs or panics.

use crate::error::{Result, StackcostError};
use crate::pricing::{PriceQuery, PriceResult, PricingSource};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://pricing.us-east-1.amazonaws.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Wire shape of a regional offer file (the subset we read).
#[derive(Debug, Deserialize)]
struct OfferDocument {
    #[serde(default)]
    products: HashMap<String, OfferProduct>,
    #[serde(default)]
    terms: OfferTerms,
}

#[derive(Debug, Deserialize)]
struct OfferProduct {
    #[serde(rename = "productFamily", default)]
    product_family: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct OfferTerms {
    #[serde(rename = "OnDemand", default)]
    on_demand: HashMap<String, HashMap<String, OfferTerm>>,
}

#[derive(Debug, Deserialize)]
struct OfferTerm {
    #[serde(rename = "priceDimensions", default)]
    price_dimensions: HashMap<String, PriceDimension>,
}

#[derive(Debug, Deserialize)]
struct PriceDimension {
    #[serde(default)]
    unit: String,
    #[serde(rename = "pricePerUnit", default)]
    price_per_unit: HashMap<String, String>,
}

/// HTTP client for the AWS Price List bulk offers.
pub struct PriceListClient {
    http: reqwest::Client,
    base_url: String,
    retry: ExponentialBackoffPolicy,
    // Offer files run to tens of MB; fetch each (service, region) pair once.
    offers: Mutex<HashMap<String, Arc<OfferDocument>>>,
}

impl PriceListClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at an alternate feed host (used by tests).
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StackcostError::PricingSource(format!("HTTP client init: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: ExponentialBackoffPolicy::for_pricing_feed(),
            offers: Mutex::new(HashMap::new()),
        })
    }

    async fn offer_document(&self, service: &str, region: &str) -> Result<Arc<OfferDocument>> {
        let key = format!("{service}/{region}");

        let mut offers = self.offers.lock().await;
        if let Some(doc) = offers.get(&key) {
            return Ok(Arc::clone(doc));
        }

        let url = format!(
            "{}/offers/v1.0/aws/{service}/current/{region}/index.json",
            self.base_url
        );
        debug!("Fetching price list offer file: {}", url);

        let doc = self
            .retry
            .execute_with_retry(|| self.fetch_offer(&url))
            .await?;
        let doc = Arc::new(doc);
        offers.insert(key, Arc::clone(&doc));
        Ok(doc)
    }

    async fn fetch_offer(&self, url: &str) -> Result<OfferDocument> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| StackcostError::PricingSource(format!("GET {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(StackcostError::PricingSource(format!(
                "GET {url}: HTTP {}",
                response.status()
            )));
        }

        response
            .json::<OfferDocument>()
            .await
            .map_err(|e| StackcostError::PricingSource(format!("malformed offer file: {e}")))
    }

    /// First SKU whose product family and attributes cover the query's filters.
    fn match_product<'a>(doc: &'a OfferDocument, query: &PriceQuery) -> Option<&'a str> {
        let mut skus: Vec<&String> = doc.products.keys().collect();
        skus.sort(); // deterministic pick when several SKUs match
        skus.into_iter().find_map(|sku| {
            let product = &doc.products[sku];
            let family_matches = product.product_family == query.product_family;
            let attrs_match = query
                .attributes
                .iter()
                .all(|(k, v)| product.attributes.get(k) == Some(v));
            (family_matches && attrs_match).then_some(sku.as_str())
        })
    }

    /// First non-zero USD on-demand price dimension for the SKU.
    fn on_demand_price(doc: &OfferDocument, sku: &str) -> Option<(f64, String)> {
        let terms = doc.terms.on_demand.get(sku)?;
        let mut term_codes: Vec<&String> = terms.keys().collect();
        term_codes.sort();
        for code in term_codes {
            let term = &terms[code];
            let mut dim_codes: Vec<&String> = term.price_dimensions.keys().collect();
            dim_codes.sort();
            for dim_code in dim_codes {
                let dim = &term.price_dimensions[dim_code];
                if let Some(price) = dim
                    .price_per_unit
                    .get("USD")
                    .and_then(|p| p.parse::<f64>().ok())
                {
                    if price > 0.0 {
                        return Some((price, dim.unit.clone()));
                    }
                }
            }
        }
        None
    }
}

#[async_trait]
impl PricingSource for PriceListClient {
    async fn get_price(&self, query: &PriceQuery) -> Result<PriceResult> {
        let doc = self.offer_document(&query.service, &query.region).await?;

        let not_found = || StackcostError::PriceNotFound {
            service: query.service.clone(),
            product_family: query.product_family.clone(),
            region: query.region.clone(),
        };

        let sku = Self::match_product(&doc, query).ok_or_else(not_found)?;
        let (unit_price, unit) = Self::on_demand_price(&doc, sku).ok_or_else(not_found)?;

        Ok(PriceResult {
            query: query.clone(),
            sku: sku.to_string(),
            unit_price,
            unit,
            currency: "USD".to_string(),
            fetched_at: Utc::now(),
            from_cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer_fixture() -> &'static str {
        r#"{
            "products": {
                "SKU1": {
                    "productFamily": "Compute Instance",
                    "attributes": {
                        "instanceType": "t3.micro",
                        "operatingSystem": "Linux",
                        "tenancy": "Shared",
                        "preInstalledSw": "NA",
                        "capacitystatus": "Used"
                    }
                },
                "SKU2": {
                    "productFamily": "Compute Instance",
                    "attributes": {
                        "instanceType": "m5.large",
                        "operatingSystem": "Linux",
                        "tenancy": "Shared",
                        "preInstalledSw": "NA",
                        "capacitystatus": "Used"
                    }
                }
            },
            "terms": {
                "OnDemand": {
                    "SKU1": {
                        "SKU1.TERM": {
                            "priceDimensions": {
                                "SKU1.TERM.DIM": {
                                    "unit": "Hrs",
                                    "pricePerUnit": { "USD": "0.0104000000" }
                                }
                            }
                        }
                    },
                    "SKU2": {
                        "SKU2.TERM": {
                            "priceDimensions": {
                                "SKU2.TERM.DIM": {
                                    "unit": "Hrs",
                                    "pricePerUnit": { "USD": "0.0960000000" }
                                }
                            }
                        }
                    }
                }
            }
        }"#
    }

    #[tokio::test]
    async fn test_resolves_matching_sku() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/offers/v1.0/aws/AmazonEC2/current/us-east-1/index.json",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(offer_fixture())
            .create_async()
            .await;

        let client = PriceListClient::with_base_url(&server.url()).unwrap();
        let query = PriceQuery::new("AmazonEC2", "Compute Instance", "us-east-1")
            .with_attribute("instanceType", "m5.large");

        let result = client.get_price(&query).await.unwrap();
        assert_eq!(result.sku, "SKU2");
        assert!((result.unit_price - 0.096).abs() < 1e-9);
        assert_eq!(result.unit, "Hrs");
        assert!(!result.from_cache);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_offer_file_fetched_once_per_service_region() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/offers/v1.0/aws/AmazonEC2/current/us-east-1/index.json",
            )
            .with_status(200)
            .with_body(offer_fixture())
            .expect(1)
            .create_async()
            .await;

        let client = PriceListClient::with_base_url(&server.url()).unwrap();
        for instance_type in ["t3.micro", "m5.large"] {
            let query = PriceQuery::new("AmazonEC2", "Compute Instance", "us-east-1")
                .with_attribute("instanceType", instance_type);
            client.get_price(&query).await.unwrap();
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unmatched_query_is_price_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                "/offers/v1.0/aws/AmazonEC2/current/us-east-1/index.json",
            )
            .with_status(200)
            .with_body(offer_fixture())
            .create_async()
            .await;

        let client = PriceListClient::with_base_url(&server.url()).unwrap();
        let query = PriceQuery::new("AmazonEC2", "Compute Instance", "us-east-1")
            .with_attribute("instanceType", "u-24tb1.metal");

        let err = client.get_price(&query).await.unwrap_err();
        assert!(matches!(err, StackcostError::PriceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_server_error_surfaces_as_pricing_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                "/offers/v1.0/aws/AmazonEC2/current/us-east-1/index.json",
            )
            .with_status(500)
            .expect_at_least(1)
            .create_async()
            .await;

        let client = PriceListClient::with_base_url(&server.url()).unwrap();
        let query = PriceQuery::new("AmazonEC2", "Compute Instance", "us-east-1");
        let err = client.get_price(&query).await.unwrap_err();
        assert!(matches!(
            err,
            StackcostError::Retryable { .. } | StackcostError::PricingSource(_)
        ));
    }
}
