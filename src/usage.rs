//! Monthly usage estimation
//!
//! `estimate_usage` is a pure function of `(Resource, UsageProfile)` and is
//! total: an unrecognized resource type yields a quantity-only default estimate
//! rather than an error, so an unusual or forward-looking template still gets
//! *some* estimate. Pricing failures are the pricer's concern, not ours.
//!
//! Each supported resource kind populates exactly the usage fields its pricing
//! model consumes. The pricer's cost formulas depend on this: an hourly-billed
//! kind must populate `monthly_hours`, a storage kind `storage_gb`, and so on.
//! All profile sensitivity is baked into the absolute numbers here; there is no
//! separate utilization multiplier carried on the estimate.

use crate::template::Resource;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Hours in the billing month used throughout the estimator (AWS convention).
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Default EC2 instance size when a template omits `InstanceType`.
pub const DEFAULT_EC2_INSTANCE_TYPE: &str = "t3.micro";

/// Default RDS instance class when a template omits `DBInstanceClass`.
pub const DEFAULT_RDS_INSTANCE_CLASS: &str = "db.t3.micro";

/// Default RDS allocated storage (GB) when a template omits `AllocatedStorage`.
pub const DEFAULT_RDS_STORAGE_GB: f64 = 20.0;

/// Default EBS volume size (GB) when a template omits `Size`.
pub const DEFAULT_EBS_SIZE_GB: f64 = 8.0;

/// Coarse growth-stage label used to scale estimated usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UsageProfile {
    /// Proof-of-concept: resources mostly idle
    Minimal,
    /// Small team or staging environment
    Light,
    /// Steady production traffic
    Moderate,
    /// Enterprise-scale, near-continuous load
    Heavy,
}

impl UsageProfile {
    /// Compute-uptime multiplier against a full-month baseline.
    pub fn utilization(&self) -> f64 {
        match self {
            UsageProfile::Minimal => 0.10,
            UsageProfile::Light => 0.30,
            UsageProfile::Moderate => 0.60,
            UsageProfile::Heavy => 1.00,
        }
    }

    /// Parse a profile name, failing closed to `Light` on anything unknown.
    pub fn parse_lossy(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => UsageProfile::Minimal,
            "light" => UsageProfile::Light,
            "moderate" => UsageProfile::Moderate,
            "heavy" => UsageProfile::Heavy,
            _ => UsageProfile::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UsageProfile::Minimal => "minimal",
            UsageProfile::Light => "light",
            UsageProfile::Moderate => "moderate",
            UsageProfile::Heavy => "heavy",
        }
    }
}

impl std::fmt::Display for UsageProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of resource kinds the estimator and pricer understand.
///
/// Dispatch happens here once; everything downstream matches on the kind
/// rather than re-inspecting type strings. `Unknown` is the explicit fallback
/// arm for types we pass through but cannot price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Ec2Instance,
    RdsInstance,
    NatGateway,
    S3Bucket,
    EbsVolume,
    LambdaFunction,
    DynamoDbTable,
    CloudWatchAlarm,
    Unknown,
}

impl ResourceKind {
    pub fn from_type(resource_type: &str) -> Self {
        match resource_type {
            "AWS::EC2::Instance" => ResourceKind::Ec2Instance,
            "AWS::RDS::DBInstance" => ResourceKind::RdsInstance,
            "AWS::EC2::NatGateway" => ResourceKind::NatGateway,
            "AWS::S3::Bucket" => ResourceKind::S3Bucket,
            "AWS::EC2::Volume" => ResourceKind::EbsVolume,
            "AWS::Lambda::Function" => ResourceKind::LambdaFunction,
            "AWS::DynamoDB::Table" => ResourceKind::DynamoDbTable,
            "AWS::CloudWatch::Alarm" => ResourceKind::CloudWatchAlarm,
            _ => ResourceKind::Unknown,
        }
    }

    /// Coarse service bucket used for the by-service cost breakdown.
    pub fn service_name(&self, resource_type: &str) -> String {
        match self {
            ResourceKind::Ec2Instance => "EC2".to_string(),
            ResourceKind::RdsInstance => "RDS".to_string(),
            ResourceKind::NatGateway => "VPC".to_string(),
            ResourceKind::S3Bucket => "S3".to_string(),
            ResourceKind::EbsVolume => "EBS".to_string(),
            ResourceKind::LambdaFunction => "Lambda".to_string(),
            ResourceKind::DynamoDbTable => "DynamoDB".to_string(),
            ResourceKind::CloudWatchAlarm => "CloudWatch".to_string(),
            // "AWS::Foo::Bar" buckets under "Foo"
            ResourceKind::Unknown => resource_type
                .split("::")
                .nth(1)
                .unwrap_or("Other")
                .to_string(),
        }
    }
}

/// Projected monthly consumption for one resource.
///
/// Only the fields relevant to the kind's pricing model are non-zero; zero
/// fields must never be multiplied into a cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub resource_type: String,
    pub logical_id: String,
    pub service_name: String,
    pub instance_type: Option<String>,
    pub quantity: u32,
    pub monthly_hours: f64,
    pub storage_gb: f64,
    pub requests_per_month: f64,
}

impl ResourceUsage {
    fn base(resource: &Resource, kind: ResourceKind) -> Self {
        Self {
            resource_type: resource.resource_type.clone(),
            logical_id: resource.logical_id.clone(),
            service_name: kind.service_name(&resource.resource_type),
            instance_type: None,
            quantity: 1,
            monthly_hours: 0.0,
            storage_gb: 0.0,
            requests_per_month: 0.0,
        }
    }
}

/// Estimate monthly usage for one resource under the given profile.
pub fn estimate_usage(resource: &Resource, profile: UsageProfile) -> ResourceUsage {
    let kind = ResourceKind::from_type(&resource.resource_type);
    let mut usage = ResourceUsage::base(resource, kind);

    match kind {
        // Elastic compute: active hours scale with the profile against a
        // full-month baseline.
        ResourceKind::Ec2Instance => {
            usage.instance_type =
                Some(resource.string_property("InstanceType", DEFAULT_EC2_INSTANCE_TYPE));
            usage.monthly_hours = HOURS_PER_MONTH * profile.utilization();
        }
        // Always-on stateful: databases are not shut down between environments,
        // so uptime ignores the profile. Declared storage still applies.
        ResourceKind::RdsInstance => {
            usage.instance_type =
                Some(resource.string_property("DBInstanceClass", DEFAULT_RDS_INSTANCE_CLASS));
            usage.monthly_hours = HOURS_PER_MONTH;
            usage.storage_gb = resource.number_property("AllocatedStorage", DEFAULT_RDS_STORAGE_GB);
        }
        // NAT gateways bill hourly and stay up as long as the VPC exists.
        ResourceKind::NatGateway => {
            usage.monthly_hours = HOURS_PER_MONTH;
        }
        // Storage footprint does not shrink proportionally to uptime, so each
        // profile gets an absolute GB figure rather than a multiplier.
        ResourceKind::S3Bucket => {
            usage.storage_gb = match profile {
                UsageProfile::Minimal => 5.0,
                UsageProfile::Light => 50.0,
                UsageProfile::Moderate => 500.0,
                UsageProfile::Heavy => 5_000.0,
            };
        }
        ResourceKind::EbsVolume => {
            usage.storage_gb = resource.number_property("Size", DEFAULT_EBS_SIZE_GB);
        }
        // Request-driven: absolute monthly counts spanning several orders of
        // magnitude across profiles.
        ResourceKind::LambdaFunction => {
            usage.requests_per_month = match profile {
                UsageProfile::Minimal => 10_000.0,
                UsageProfile::Light => 1_000_000.0,
                UsageProfile::Moderate => 10_000_000.0,
                UsageProfile::Heavy => 100_000_000.0,
            };
        }
        ResourceKind::DynamoDbTable => {
            usage.requests_per_month = match profile {
                UsageProfile::Minimal => 100_000.0,
                UsageProfile::Light => 5_000_000.0,
                UsageProfile::Moderate => 50_000_000.0,
                UsageProfile::Heavy => 500_000_000.0,
            };
            usage.storage_gb = match profile {
                UsageProfile::Minimal => 1.0,
                UsageProfile::Light => 10.0,
                UsageProfile::Moderate => 100.0,
                UsageProfile::Heavy => 1_000.0,
            };
        }
        // Flat-rate: the alarm's existence drives cost, not its usage.
        ResourceKind::CloudWatchAlarm => {}
        ResourceKind::Unknown => {}
    }

    usage
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn resource(resource_type: &str, properties: serde_json::Value) -> Resource {
        Resource {
            resource_type: resource_type.to_string(),
            logical_id: "Test".to_string(),
            properties: properties.as_object().cloned().unwrap_or_else(Map::new),
        }
    }

    #[test]
    fn test_profile_parse_lossy_fails_closed_to_light() {
        assert_eq!(UsageProfile::parse_lossy("heavy"), UsageProfile::Heavy);
        assert_eq!(UsageProfile::parse_lossy("MODERATE"), UsageProfile::Moderate);
        assert_eq!(UsageProfile::parse_lossy("gigantic"), UsageProfile::Light);
        assert_eq!(UsageProfile::parse_lossy(""), UsageProfile::Light);
    }

    #[test]
    fn test_ec2_hours_scale_with_profile() {
        let r = resource("AWS::EC2::Instance", serde_json::json!({}));
        let minimal = estimate_usage(&r, UsageProfile::Minimal);
        let heavy = estimate_usage(&r, UsageProfile::Heavy);
        assert!((minimal.monthly_hours - 73.0).abs() < 1e-9);
        assert!((heavy.monthly_hours - 730.0).abs() < 1e-9);
    }

    #[test]
    fn test_ec2_default_instance_type_fallback() {
        let r = resource("AWS::EC2::Instance", serde_json::json!({}));
        let usage = estimate_usage(&r, UsageProfile::Light);
        assert_eq!(usage.instance_type.as_deref(), Some(DEFAULT_EC2_INSTANCE_TYPE));
    }

    #[test]
    fn test_rds_is_always_on() {
        let r = resource(
            "AWS::RDS::DBInstance",
            serde_json::json!({"DBInstanceClass": "db.r5.large"}),
        );
        for profile in [UsageProfile::Minimal, UsageProfile::Heavy] {
            let usage = estimate_usage(&r, profile);
            assert_eq!(usage.monthly_hours, HOURS_PER_MONTH);
            assert_eq!(usage.instance_type.as_deref(), Some("db.r5.large"));
        }
    }

    #[test]
    fn test_rds_storage_default() {
        let r = resource("AWS::RDS::DBInstance", serde_json::json!({}));
        let usage = estimate_usage(&r, UsageProfile::Light);
        assert_eq!(usage.storage_gb, DEFAULT_RDS_STORAGE_GB);
    }

    #[test]
    fn test_s3_storage_is_profile_indexed_absolute() {
        let r = resource("AWS::S3::Bucket", serde_json::json!({}));
        let light = estimate_usage(&r, UsageProfile::Light);
        let heavy = estimate_usage(&r, UsageProfile::Heavy);
        assert_eq!(light.storage_gb, 50.0);
        assert_eq!(heavy.storage_gb, 5_000.0);
        assert_eq!(light.monthly_hours, 0.0);
    }

    #[test]
    fn test_lambda_requests_span_orders_of_magnitude() {
        let r = resource("AWS::Lambda::Function", serde_json::json!({}));
        let minimal = estimate_usage(&r, UsageProfile::Minimal);
        let heavy = estimate_usage(&r, UsageProfile::Heavy);
        assert!(heavy.requests_per_month / minimal.requests_per_month >= 1_000.0);
    }

    #[test]
    fn test_alarm_is_quantity_only() {
        let r = resource("AWS::CloudWatch::Alarm", serde_json::json!({}));
        let usage = estimate_usage(&r, UsageProfile::Heavy);
        assert_eq!(usage.quantity, 1);
        assert_eq!(usage.monthly_hours, 0.0);
        assert_eq!(usage.storage_gb, 0.0);
        assert_eq!(usage.requests_per_month, 0.0);
    }

    #[test]
    fn test_unknown_type_gets_default_estimate() {
        let r = resource("AWS::Future::Widget", serde_json::json!({"Anything": true}));
        let usage = estimate_usage(&r, UsageProfile::Moderate);
        assert_eq!(usage.quantity, 1);
        assert_eq!(usage.monthly_hours, 0.0);
        assert_eq!(usage.service_name, "Future");
    }

    #[test]
    fn test_ebs_size_property() {
        let r = resource("AWS::EC2::Volume", serde_json::json!({"Size": 100}));
        let usage = estimate_usage(&r, UsageProfile::Light);
        assert_eq!(usage.storage_gb, 100.0);

        let r = resource("AWS::EC2::Volume", serde_json::json!({}));
        let usage = estimate_usage(&r, UsageProfile::Light);
        assert_eq!(usage.storage_gb, DEFAULT_EBS_SIZE_GB);
    }
}
