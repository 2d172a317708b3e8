//! End-to-end estimation pipeline
//!
//! Resolves the target engine and candidate instance families from a
//! parsed report, sizes one instance per family for both the spec-based
//! and the cache-based requirement, gathers price quotes for every
//! (instance, topology, strategy) combination, and hands everything to
//! the projection engine.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::catalog::{
    self, PricingCatalog, ORACLE_ENGINES, REFACTOR_ENGINE,
};
use crate::cost::{ProjectionEngine, ProjectionInput};
use crate::models::{InstanceSpec, MigrationStrategy, ParsedReport, Topology};
use crate::pricing::QuoteGatherer;

const DEFAULT_FAMILY: &str = "r6i";
const DEFAULT_ENGINE: &str = "oracle-ee";
const DEFAULT_MEMORY_GB: f64 = 16.0;

/// One finished estimation: the resolved target plus the flat result map.
#[derive(Debug, Clone)]
pub struct Estimate {
    pub engine: String,
    pub region: String,
    pub family_a: String,
    pub family_b: Option<String>,
    pub values: BTreeMap<String, String>,
}

/// Drives parsing output through quoting and projection.
pub struct Estimator {
    catalog: PricingCatalog,
    gatherer: QuoteGatherer,
    region: String,
    provisioned_iops: f64,
    provisioned_throughput_mbps: f64,
}

impl Estimator {
    /// `region` falls back to the catalog's default region.
    pub fn new(catalog: PricingCatalog, gatherer: QuoteGatherer, region: Option<&str>) -> Self {
        let region = region
            .map(str::to_string)
            .unwrap_or_else(|| catalog.default_region.clone());
        Self {
            catalog,
            gatherer,
            region,
            provisioned_iops: 0.0,
            provisioned_throughput_mbps: 0.0,
        }
    }

    /// Provisioned IOPS/throughput carried into the storage model.
    pub fn with_provisioning(mut self, iops: f64, throughput_mbps: f64) -> Self {
        self.provisioned_iops = iops;
        self.provisioned_throughput_mbps = throughput_mbps;
        self
    }

    /// Run the full pipeline for one parsed report.
    pub async fn estimate(&self, report: &ParsedReport) -> Estimate {
        let engine = report
            .target_engine
            .clone()
            .unwrap_or_else(|| DEFAULT_ENGINE.to_string());
        let oracle_target = ORACLE_ENGINES.contains(&engine.as_str());

        let families = self.resolve_families(report, oracle_target);
        let spec_instances = size_per_family(&families, spec_memory_requirement(report));
        let sga_instances = size_per_family(&families, cache_memory_requirement(report));

        info!(
            engine = %engine,
            region = %self.region,
            families = ?families,
            "estimating migration cost"
        );

        let specs = build_instance_specs(
            &spec_instances,
            &sga_instances,
            &self.region,
            &engine,
            oracle_target,
        );
        debug!(count = specs.len(), "instance spec combinations to quote");
        let quotes = self.gatherer.gather(&specs).await;

        let family_a = families[0].clone();
        let family_b = families.get(1).cloned();
        let values = ProjectionEngine::new(self.catalog.clone(), &self.region, &engine)
            .with_provisioning(self.provisioned_iops, self.provisioned_throughput_mbps)
            .project(&ProjectionInput {
                report,
                quotes: &quotes,
                spec_instances: &spec_instances,
                sga_instances: &sga_instances,
                family_a: family_a.clone(),
                family_b: family_b.clone(),
            });

        Estimate {
            engine,
            region: self.region.clone(),
            family_a,
            family_b,
            values,
        }
    }

    /// Candidate families, led by the family of the recommended instance.
    fn resolve_families(&self, report: &ParsedReport, oracle_target: bool) -> Vec<String> {
        let base = report
            .instance_by_size
            .as_deref()
            .or(report.instance_by_cache.as_deref())
            .and_then(catalog::split_instance_token)
            .map(|(family, _)| family)
            .unwrap_or_else(|| DEFAULT_FAMILY.to_string());
        catalog::expand_families(&base, oracle_target)
    }
}

/// Memory the replacement must cover going by the current server: the
/// recommended instance when one exists, otherwise the physical memory.
fn spec_memory_requirement(report: &ParsedReport) -> f64 {
    report
        .instance_by_size
        .as_deref()
        .and_then(catalog::instance_resources)
        .map(|resources| resources.memory_gb)
        .or(report.server.physical_memory_gb)
        .unwrap_or(DEFAULT_MEMORY_GB)
}

/// Memory requirement going by the cache advice instead of the host.
fn cache_memory_requirement(report: &ParsedReport) -> f64 {
    report
        .instance_by_cache
        .as_deref()
        .and_then(catalog::instance_resources)
        .map(|resources| resources.memory_gb)
        .or(report.cache_advice.recommended_gb)
        .or(report.cache_advice.current_gb)
        .unwrap_or_else(|| spec_memory_requirement(report))
}

fn size_per_family(families: &[String], memory_gb: f64) -> BTreeMap<String, String> {
    families
        .iter()
        .filter_map(|family| {
            catalog::find_matching_instance(memory_gb, family)
                .map(|token| (family.clone(), token))
        })
        .collect()
}

/// Every combination worth quoting: each sized instance at both
/// topologies on the replatform path, plus the refactor path (single
/// zone, cache-sized) when the source engine has one.
fn build_instance_specs(
    spec_instances: &BTreeMap<String, String>,
    sga_instances: &BTreeMap<String, String>,
    region: &str,
    engine: &str,
    oracle_target: bool,
) -> Vec<InstanceSpec> {
    let mut specs = Vec::new();

    let mut replatform_tokens: Vec<&String> =
        spec_instances.values().chain(sga_instances.values()).collect();
    replatform_tokens.sort();
    replatform_tokens.dedup();

    for token in &replatform_tokens {
        for topology in [Topology::SingleZone, Topology::MultiZone] {
            specs.push(InstanceSpec {
                instance_type: (*token).clone(),
                region: region.to_string(),
                engine: engine.to_string(),
                strategy: MigrationStrategy::Replatform,
                topology,
            });
        }
    }

    if oracle_target {
        for token in sga_instances.values() {
            specs.push(InstanceSpec {
                instance_type: token.clone(),
                region: region.to_string(),
                engine: REFACTOR_ENGINE.to_string(),
                strategy: MigrationStrategy::Refactor,
                topology: Topology::SingleZone,
            });
        }
    }

    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CacheSizingAdvice, ServerSpec};

    fn report_with(
        instance_by_size: Option<&str>,
        instance_by_cache: Option<&str>,
        target_engine: Option<&str>,
    ) -> ParsedReport {
        ParsedReport {
            server: ServerSpec {
                physical_memory_gb: Some(96.0),
                ..Default::default()
            },
            cache_advice: CacheSizingAdvice {
                current_gb: Some(24.0),
                recommended_gb: Some(48.0),
            },
            instance_by_size: instance_by_size.map(str::to_string),
            instance_by_cache: instance_by_cache.map(str::to_string),
            target_engine: target_engine.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_spec_requirement_prefers_recommended_instance() {
        let report = report_with(Some("db.r6i.2xlarge"), None, None);
        // db.r6i.2xlarge carries 64 GB
        assert_eq!(spec_memory_requirement(&report), 64.0);

        let report = report_with(None, None, None);
        assert_eq!(spec_memory_requirement(&report), 96.0);
    }

    #[test]
    fn test_cache_requirement_falls_back_to_advice() {
        let report = report_with(None, None, None);
        assert_eq!(cache_memory_requirement(&report), 48.0);
    }

    #[test]
    fn test_sizing_picks_smallest_covering_instance() {
        let sized = size_per_family(&["r6i".to_string()], 48.0);
        assert_eq!(sized["r6i"], "db.r6i.2xlarge");

        let sized = size_per_family(&["r6i".to_string()], 100_000.0);
        assert_eq!(sized["r6i"], "db.r6i.24xlarge");
    }

    #[test]
    fn test_oracle_target_adds_refactor_specs_single_zone_only() {
        let spec_map = BTreeMap::from([("r6i".to_string(), "db.r6i.4xlarge".to_string())]);
        let sga_map = BTreeMap::from([("r6i".to_string(), "db.r6i.2xlarge".to_string())]);

        let specs =
            build_instance_specs(&spec_map, &sga_map, "ap-northeast-2", "oracle-ee", true);
        let refactor: Vec<_> = specs
            .iter()
            .filter(|s| s.strategy == MigrationStrategy::Refactor)
            .collect();
        assert_eq!(refactor.len(), 1);
        assert_eq!(refactor[0].engine, "aurora-postgresql");
        assert_eq!(refactor[0].topology, Topology::SingleZone);

        // two tokens, two topologies each
        let replatform = specs.len() - refactor.len();
        assert_eq!(replatform, 4);
    }

    #[test]
    fn test_non_oracle_target_skips_refactor() {
        let spec_map = BTreeMap::from([("r6i".to_string(), "db.r6i.4xlarge".to_string())]);
        let specs = build_instance_specs(
            &spec_map,
            &spec_map,
            "ap-northeast-2",
            "aurora-postgresql",
            false,
        );
        assert!(specs
            .iter()
            .all(|s| s.strategy == MigrationStrategy::Replatform));
    }
}
