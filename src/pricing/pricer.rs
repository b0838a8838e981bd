//! Per-resource monthly cost resolution
//!
//! The pricer turns a `ResourceUsage` into dollars in three steps: build the
//! pricing queries for the resource kind, resolve each one (cache first, then
//! the injected source), and apply the kind's cost formula.
//!
//! The formulas are the correctness core of the crate: each one must consume
//! exactly the usage field the estimator populated for that kind. An
//! hourly-billed kind multiplies by `monthly_hours`, storage by `storage_gb`,
//! request-billed kinds convert `requests_per_month` through the source's
//! billing granularity, and flat-rate kinds use `quantity` alone.

use crate::error::{Result, StackcostError};
use crate::pricing::cache::PriceCache;
use crate::pricing::{PriceQuery, PriceResult, PricingSource};
use crate::usage::{ResourceKind, ResourceUsage};
use tracing::debug;

// --- Query builders -------------------------------------------------------
//
// Attribute sets mirror the filters the AWS Price List feed needs to land on
// a single on-demand Linux/shared-tenancy SKU. The static source registers
// prices under these exact queries, so both sources stay interchangeable.

pub fn ec2_instance_query(instance_type: &str, region: &str) -> PriceQuery {
    PriceQuery::new("AmazonEC2", "Compute Instance", region)
        .with_attribute("instanceType", instance_type)
        .with_attribute("operatingSystem", "Linux")
        .with_attribute("tenancy", "Shared")
        .with_attribute("preInstalledSw", "NA")
        .with_attribute("capacitystatus", "Used")
}

pub fn rds_instance_query(instance_class: &str, region: &str) -> PriceQuery {
    PriceQuery::new("AmazonRDS", "Database Instance", region)
        .with_attribute("instanceType", instance_class)
        .with_attribute("databaseEngine", "PostgreSQL")
        .with_attribute("deploymentOption", "Single-AZ")
}

pub fn rds_storage_query(region: &str) -> PriceQuery {
    PriceQuery::new("AmazonRDS", "Database Storage", region)
        .with_attribute("volumeType", "General Purpose")
        .with_attribute("deploymentOption", "Single-AZ")
}

pub fn nat_gateway_query(region: &str) -> PriceQuery {
    PriceQuery::new("AmazonEC2", "NAT Gateway", region)
        .with_attribute("operation", "NatGateway")
}

pub fn s3_storage_query(region: &str) -> PriceQuery {
    PriceQuery::new("AmazonS3", "Storage", region)
        .with_attribute("storageClass", "General Purpose")
        .with_attribute("volumeType", "Standard")
}

pub fn ebs_storage_query(region: &str) -> PriceQuery {
    PriceQuery::new("AmazonEC2", "Storage", region).with_attribute("volumeApiName", "gp3")
}

pub fn lambda_request_query(region: &str) -> PriceQuery {
    PriceQuery::new("AWSLambda", "Serverless", region)
        .with_attribute("group", "AWS-Lambda-Requests")
}

pub fn dynamodb_request_query(region: &str) -> PriceQuery {
    PriceQuery::new(
        "AmazonDynamoDB",
        "Amazon DynamoDB PayPerRequest Throughput",
        region,
    )
}

pub fn dynamodb_storage_query(region: &str) -> PriceQuery {
    PriceQuery::new("AmazonDynamoDB", "Database Storage", region)
}

pub fn cloudwatch_alarm_query(region: &str) -> PriceQuery {
    PriceQuery::new("AmazonCloudWatch", "Alarm", region).with_attribute("alarmType", "Standard")
}

/// Resolves per-resource monthly costs against a cache-fronted pricing source.
pub struct ResourcePricer {
    source: Box<dyn PricingSource>,
    cache: PriceCache,
}

impl ResourcePricer {
    pub fn new(source: Box<dyn PricingSource>, cache: PriceCache) -> Self {
        Self { source, cache }
    }

    /// Monthly cost in USD for one usage estimate.
    ///
    /// Fails when the resource kind has no query mapping or when any of its
    /// queries cannot be resolved — the analyzer records such failures
    /// per-resource rather than aborting the run.
    pub async fn get_price(&self, usage: &ResourceUsage, region: &str) -> Result<f64> {
        let kind = ResourceKind::from_type(&usage.resource_type);

        let cost = match kind {
            ResourceKind::Ec2Instance => {
                let instance_type = usage.instance_type.as_deref().ok_or_else(|| {
                    StackcostError::Validation {
                        field: "instance_type".to_string(),
                        reason: "missing on EC2 usage estimate".to_string(),
                    }
                })?;
                let price = self.resolve(&ec2_instance_query(instance_type, region)).await?;
                price.unit_price * usage.monthly_hours
            }
            ResourceKind::RdsInstance => {
                let instance_class = usage.instance_type.as_deref().ok_or_else(|| {
                    StackcostError::Validation {
                        field: "instance_type".to_string(),
                        reason: "missing on RDS usage estimate".to_string(),
                    }
                })?;
                let instance = self
                    .resolve(&rds_instance_query(instance_class, region))
                    .await?;
                let storage = self.resolve(&rds_storage_query(region)).await?;
                instance.unit_price * usage.monthly_hours + storage.unit_price * usage.storage_gb
            }
            ResourceKind::NatGateway => {
                let price = self.resolve(&nat_gateway_query(region)).await?;
                price.unit_price * usage.monthly_hours
            }
            ResourceKind::S3Bucket => {
                let price = self.resolve(&s3_storage_query(region)).await?;
                price.unit_price * usage.storage_gb
            }
            ResourceKind::EbsVolume => {
                let price = self.resolve(&ebs_storage_query(region)).await?;
                price.unit_price * usage.storage_gb
            }
            ResourceKind::LambdaFunction => {
                let price = self.resolve(&lambda_request_query(region)).await?;
                request_cost(&price, usage.requests_per_month)
            }
            ResourceKind::DynamoDbTable => {
                let requests = self.resolve(&dynamodb_request_query(region)).await?;
                let storage = self.resolve(&dynamodb_storage_query(region)).await?;
                request_cost(&requests, usage.requests_per_month)
                    + storage.unit_price * usage.storage_gb
            }
            ResourceKind::CloudWatchAlarm => {
                let price = self.resolve(&cloudwatch_alarm_query(region)).await?;
                price.unit_price * f64::from(usage.quantity)
            }
            ResourceKind::Unknown => {
                return Err(StackcostError::Pricing {
                    resource_type: usage.resource_type.clone(),
                    logical_id: usage.logical_id.clone(),
                    message: "no pricing queries mapped for this resource type".to_string(),
                    source: None,
                });
            }
        };

        Ok(cost)
    }

    /// Cache-first query resolution. Fresh results are written back
    /// best-effort; cache failures never block pricing.
    async fn resolve(&self, query: &PriceQuery) -> Result<PriceResult> {
        if let Some(cached) = self.cache.get(query) {
            debug!("Price cache hit: {}", query.canonical_string());
            return Ok(cached);
        }

        let result = self.source.get_price(query).await?;
        self.cache.set(query, &result);
        Ok(result)
    }
}

/// Convert a request count through the source's billing granularity.
///
/// The Price List feed prices Lambda at USD per single request ("Requests"),
/// while coarser tables quote per million ("1M Requests" or similar).
fn request_cost(price: &PriceResult, requests_per_month: f64) -> f64 {
    if price.unit.contains("1M") || price.unit.to_ascii_lowercase().contains("million") {
        price.unit_price * (requests_per_month / 1_000_000.0)
    } else {
        price.unit_price * requests_per_month
    }
}
