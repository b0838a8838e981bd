//! Pricing data types and sources
//!
//! A `PriceQuery` is a canonical, hashable request for a unit price; a
//! `PriceResult` carries the resolved price plus provenance (`fetched_at`,
//! `from_cache`) for staleness debugging. The `PricingSource` trait abstracts
//! where prices come from: the AWS Price List feed in production
//! (`client::PriceListClient`) or a fixed in-memory table in tests and offline
//! mode (`StaticPricingSource`). The engine depends only on the trait, so the
//! two are interchangeable without code changes.

pub mod cache;
pub mod client;
pub mod pricer;

use crate::error::{Result, StackcostError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Canonical request for a unit price.
///
/// `attributes` is a BTreeMap so two queries built from the same fields in any
/// order serialize, hash, and cache identically. Queries are never mutated
/// after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceQuery {
    pub service: String,
    pub product_family: String,
    pub region: String,
    pub attributes: BTreeMap<String, String>,
}

impl PriceQuery {
    pub fn new(service: &str, product_family: &str, region: &str) -> Self {
        Self {
            service: service.to_string(),
            product_family: product_family.to_string(),
            region: region.to_string(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    /// Stable textual form of every field, used as the cache key preimage.
    /// BTreeMap iteration order makes this independent of insertion order.
    pub fn canonical_string(&self) -> String {
        let mut s = format!("{}|{}|{}", self.service, self.product_family, self.region);
        for (k, v) in &self.attributes {
            s.push('|');
            s.push_str(k);
            s.push('=');
            s.push_str(v);
        }
        s
    }
}

/// A resolved unit price with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResult {
    pub query: PriceQuery,
    pub sku: String,
    pub unit_price: f64,
    /// Billing unit as reported by the source, e.g. "Hrs", "GB-Mo", "Requests".
    pub unit: String,
    pub currency: String,
    pub fetched_at: DateTime<Utc>,
    pub from_cache: bool,
}

/// Source of unit prices, satisfiable by the network feed or a fixed table.
#[async_trait]
pub trait PricingSource: Send + Sync {
    /// Resolve one query to a price. A query with no matching product is an
    /// error, never a zero price.
    async fn get_price(&self, query: &PriceQuery) -> Result<PriceResult>;

    /// Resolve several queries. Per-query failures fail the batch; callers
    /// that want partial results issue queries individually.
    async fn get_prices(&self, queries: &[PriceQuery]) -> Result<Vec<PriceResult>> {
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            results.push(self.get_price(query).await?);
        }
        Ok(results)
    }
}

/// In-memory pricing table keyed by canonical query string.
///
/// Used by tests and by `--offline` runs where hitting the Price List feed is
/// unwanted. `builtin` ships approximate us-east-1 on-demand rates.
#[derive(Debug, Default, Clone)]
pub struct StaticPricingSource {
    prices: HashMap<String, (String, f64, String)>,
}

impl StaticPricingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, query: PriceQuery, sku: &str, unit_price: f64, unit: &str) -> Self {
        self.prices.insert(
            query.canonical_string(),
            (sku.to_string(), unit_price, unit.to_string()),
        );
        self
    }

    /// Approximate on-demand rates for the resource kinds the pricer knows,
    /// in the given region. Real runs should prefer the Price List feed.
    pub fn builtin(region: &str) -> Self {
        let mut source = Self::new();
        for (instance_type, rate) in [
            ("t3.micro", 0.0104),
            ("t3.small", 0.0208),
            ("t3.medium", 0.0416),
            ("t3.large", 0.0832),
            ("m5.large", 0.096),
            ("m5.xlarge", 0.192),
            ("m5.2xlarge", 0.384),
            ("c5.large", 0.085),
            ("c5.xlarge", 0.17),
        ] {
            source = source.with_price(
                pricer::ec2_instance_query(instance_type, region),
                &format!("builtin-ec2-{instance_type}"),
                rate,
                "Hrs",
            );
        }
        for (instance_class, rate) in [
            ("db.t3.micro", 0.017),
            ("db.t3.small", 0.034),
            ("db.t3.medium", 0.068),
            ("db.r5.large", 0.24),
            ("db.m5.large", 0.171),
        ] {
            source = source.with_price(
                pricer::rds_instance_query(instance_class, region),
                &format!("builtin-rds-{instance_class}"),
                rate,
                "Hrs",
            );
        }
        source
            .with_price(
                pricer::rds_storage_query(region),
                "builtin-rds-storage",
                0.115,
                "GB-Mo",
            )
            .with_price(
                pricer::nat_gateway_query(region),
                "builtin-natgw",
                0.045,
                "Hrs",
            )
            .with_price(
                pricer::s3_storage_query(region),
                "builtin-s3-standard",
                0.023,
                "GB-Mo",
            )
            .with_price(
                pricer::ebs_storage_query(region),
                "builtin-ebs-gp3",
                0.08,
                "GB-Mo",
            )
            .with_price(
                pricer::lambda_request_query(region),
                "builtin-lambda-req",
                0.20,
                "1M Requests",
            )
            .with_price(
                pricer::dynamodb_request_query(region),
                "builtin-ddb-req",
                0.625,
                "1M Requests",
            )
            .with_price(
                pricer::dynamodb_storage_query(region),
                "builtin-ddb-storage",
                0.25,
                "GB-Mo",
            )
            .with_price(
                pricer::cloudwatch_alarm_query(region),
                "builtin-cw-alarm",
                0.10,
                "Alarms",
            )
    }
}

#[async_trait]
impl PricingSource for StaticPricingSource {
    async fn get_price(&self, query: &PriceQuery) -> Result<PriceResult> {
        match self.prices.get(&query.canonical_string()) {
            Some((sku, unit_price, unit)) => Ok(PriceResult {
                query: query.clone(),
                sku: sku.clone(),
                unit_price: *unit_price,
                unit: unit.clone(),
                currency: "USD".to_string(),
                fetched_at: Utc::now(),
                from_cache: false,
            }),
            None => Err(StackcostError::PriceNotFound {
                service: query.service.clone(),
                product_family: query.product_family.clone(),
                region: query.region.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_string_is_attribute_order_independent() {
        let a = PriceQuery::new("AmazonEC2", "Compute Instance", "us-east-1")
            .with_attribute("instanceType", "t3.micro")
            .with_attribute("tenancy", "Shared");
        let b = PriceQuery::new("AmazonEC2", "Compute Instance", "us-east-1")
            .with_attribute("tenancy", "Shared")
            .with_attribute("instanceType", "t3.micro");
        assert_eq!(a.canonical_string(), b.canonical_string());
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_static_source_miss_is_error_not_zero() {
        let source = StaticPricingSource::new();
        let query = PriceQuery::new("AmazonEC2", "Compute Instance", "us-east-1");
        let err = source.get_price(&query).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::StackcostError::PriceNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_get_prices_resolves_batch() {
        let region = "us-east-1";
        let source = StaticPricingSource::builtin(region);
        let queries = vec![
            pricer::s3_storage_query(region),
            pricer::cloudwatch_alarm_query(region),
        ];
        let results = source.get_prices(&queries).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].query, queries[0]);
        assert_eq!(results[1].query, queries[1]);
    }

    #[tokio::test]
    async fn test_get_prices_fails_on_any_missing_query() {
        let region = "us-east-1";
        let source = StaticPricingSource::builtin(region);
        let queries = vec![
            pricer::s3_storage_query(region),
            PriceQuery::new("AmazonKinesis", "Stream", region),
        ];
        assert!(source.get_prices(&queries).await.is_err());
    }

    #[tokio::test]
    async fn test_static_source_hit_is_fresh() {
        let query = PriceQuery::new("AmazonS3", "Storage", "us-east-1");
        let source = StaticPricingSource::new().with_price(query.clone(), "sku-1", 0.023, "GB-Mo");
        let result = source.get_price(&query).await.unwrap();
        assert_eq!(result.sku, "sku-1");
        assert_eq!(result.unit_price, 0.023);
        assert!(!result.from_cache);
    }
}
