//! Template cost analysis orchestration
//!
//! Runs the four-stage pipeline: parse → estimate → price → aggregate. Parsing
//! is fail-fast (no partial analysis), estimation is total, and pricing is
//! best-effort per resource: a resource that cannot be priced lands in
//! `errors` and contributes nothing to any cost figure, but still appears in
//! `resources` and `usage_estimates` so the caller can see what wasn't priced.

use crate::error::Result;
use crate::pricing::pricer::ResourcePricer;
use crate::template::{parse_template, Resource};
use crate::usage::{estimate_usage, ResourceUsage, UsageProfile};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Monthly alarms provisioned per managed account on the bootstrap path.
const BOOTSTRAP_ALARMS_PER_ACCOUNT: u32 = 2;

/// Audit-log storage attributed to each managed account (GB).
const BOOTSTRAP_AUDIT_GB_PER_ACCOUNT: f64 = 10.0;

/// Aggregated output of one analysis call.
///
/// Invariant: the values of `by_service` and `by_resource` each sum to
/// `estimated_cost` within floating-point tolerance; unpriced resources are
/// represented only in `errors`.
#[derive(Debug, Serialize)]
pub struct TemplateAnalysis {
    pub resources: Vec<Resource>,
    /// 1:1 with `resources`, same order.
    pub usage_estimates: Vec<ResourceUsage>,
    /// Total estimated monthly cost in USD.
    pub estimated_cost: f64,
    pub by_service: HashMap<String, f64>,
    pub by_resource: HashMap<String, f64>,
    pub usage_profile: UsageProfile,
    pub region: String,
    /// Human-readable, non-fatal pricing failures.
    pub errors: Vec<String>,
}

/// Analysis engine: a pricer plus the pipeline around it.
pub struct CostAnalyzer {
    pricer: ResourcePricer,
}

impl CostAnalyzer {
    pub fn new(pricer: ResourcePricer) -> Self {
        Self { pricer }
    }

    /// Analyze a template's estimated monthly cost.
    ///
    /// Fails only when the template does not parse or declares no resources.
    /// Individual pricing failures are recorded in the returned analysis.
    pub async fn analyze_template(
        &self,
        content: &str,
        profile: UsageProfile,
        region: &str,
    ) -> Result<TemplateAnalysis> {
        let resources = parse_template(content)?;
        debug!(
            "Parsed {} resources, estimating at profile '{}'",
            resources.len(),
            profile
        );

        let estimates: Vec<ResourceUsage> = resources
            .iter()
            .map(|r| estimate_usage(r, profile))
            .collect();

        Ok(self
            .price_and_aggregate(resources, estimates, profile, region)
            .await)
    }

    /// Template-free baseline: the fixed set of account-level monitoring
    /// resources a freshly bootstrapped organization carries, scaled linearly
    /// by `num_accounts`.
    pub async fn analyze_bootstrap_only(
        &self,
        profile: UsageProfile,
        region: &str,
        num_accounts: u32,
    ) -> Result<TemplateAnalysis> {
        let num_accounts = num_accounts.max(1);
        let resources = vec![
            synthetic_resource("AWS::CloudWatch::Alarm", "AccountHealthAlarms"),
            synthetic_resource("AWS::S3::Bucket", "AuditLogArchive"),
        ];

        let mut estimates: Vec<ResourceUsage> = resources
            .iter()
            .map(|r| estimate_usage(r, profile))
            .collect();
        for usage in &mut estimates {
            match usage.resource_type.as_str() {
                "AWS::CloudWatch::Alarm" => {
                    usage.quantity = BOOTSTRAP_ALARMS_PER_ACCOUNT * num_accounts;
                }
                "AWS::S3::Bucket" => {
                    // Fixed per-account footprint; the profile-indexed figure
                    // the estimator chose does not apply to audit logs.
                    usage.storage_gb = BOOTSTRAP_AUDIT_GB_PER_ACCOUNT * f64::from(num_accounts);
                }
                _ => {}
            }
        }

        Ok(self
            .price_and_aggregate(resources, estimates, profile, region)
            .await)
    }

    /// Stage 3 + 4: price every estimate and fold the results into totals.
    ///
    /// Each lookup is independent; the merge is a commutative sum, so the
    /// loop could be parallelized without changing any result.
    async fn price_and_aggregate(
        &self,
        resources: Vec<Resource>,
        estimates: Vec<ResourceUsage>,
        profile: UsageProfile,
        region: &str,
    ) -> TemplateAnalysis {
        let mut analysis = TemplateAnalysis {
            resources,
            usage_estimates: Vec::new(),
            estimated_cost: 0.0,
            by_service: HashMap::new(),
            by_resource: HashMap::new(),
            usage_profile: profile,
            region: region.to_string(),
            errors: Vec::new(),
        };

        for usage in &estimates {
            match self.pricer.get_price(usage, region).await {
                Ok(cost) => {
                    analysis.estimated_cost += cost;
                    *analysis
                        .by_service
                        .entry(usage.service_name.clone())
                        .or_insert(0.0) += cost;
                    *analysis
                        .by_resource
                        .entry(usage.logical_id.clone())
                        .or_insert(0.0) += cost;
                }
                Err(e) => {
                    analysis.errors.push(format!(
                        "{} ({}): {}",
                        usage.logical_id, usage.resource_type, e
                    ));
                }
            }
        }

        analysis.usage_estimates = estimates;
        analysis
    }
}

fn synthetic_resource(resource_type: &str, logical_id: &str) -> Resource {
    Resource {
        resource_type: resource_type.to_string(),
        logical_id: logical_id.to_string(),
        properties: serde_json::Map::new(),
    }
}
