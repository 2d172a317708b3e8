//! Instance and pricing catalog
//!
//! Maps instance tokens to resource triples, expands a reference instance
//! into sibling families, and carries the per-region storage/network rate
//! tables as one injected value object instead of module-level globals.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EstimatorError;

/// Engines priced as the source engine under a replatform move.
pub const ORACLE_ENGINES: &[&str] = &["oracle-ee", "oracle-se2"];

/// Engines using clustered storage (no IOPS/throughput provisioning,
/// replication bundled into the per-GB rate).
pub const AURORA_ENGINES: &[&str] = &["aurora-postgresql", "aurora-mysql"];

/// Target engine for the refactor strategy.
pub const REFACTOR_ENGINE: &str = "aurora-postgresql";

/// ARM instance families; managed Oracle targets do not offer these.
pub const GRAVITON_FAMILIES: &[&str] = &["r6g", "r7g", "r8g", "m6g", "m7g", "t4g"];

static INSTANCE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^db\.([a-z0-9]+)\.(.+)$").unwrap());

/// Canonical resource triple for one instance size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InstanceResources {
    pub vcpu: u32,
    pub memory_gb: f64,
    pub network_gbps: f64,
}

const fn res(vcpu: u32, memory_gb: f64, network_gbps: f64) -> InstanceResources {
    InstanceResources {
        vcpu,
        memory_gb,
        network_gbps,
    }
}

// Memory-optimized sizes (large and up only on the managed service)
const R_SIZES: &[(&str, InstanceResources)] = &[
    ("large", res(2, 16.0, 12.5)),
    ("xlarge", res(4, 32.0, 12.5)),
    ("2xlarge", res(8, 64.0, 12.5)),
    ("4xlarge", res(16, 128.0, 12.5)),
    ("8xlarge", res(32, 256.0, 12.5)),
    ("12xlarge", res(48, 384.0, 18.75)),
    ("16xlarge", res(64, 512.0, 25.0)),
    ("24xlarge", res(96, 768.0, 37.5)),
];

// General-purpose sizes carry half the memory of the r equivalents
const M_SIZES: &[(&str, InstanceResources)] = &[
    ("large", res(2, 8.0, 12.5)),
    ("xlarge", res(4, 16.0, 12.5)),
    ("2xlarge", res(8, 32.0, 12.5)),
    ("4xlarge", res(16, 64.0, 12.5)),
    ("8xlarge", res(32, 128.0, 12.5)),
    ("12xlarge", res(48, 192.0, 18.75)),
    ("16xlarge", res(64, 256.0, 25.0)),
    ("24xlarge", res(96, 384.0, 37.5)),
];

const T_SIZES: &[(&str, InstanceResources)] = &[
    ("micro", res(2, 1.0, 0.5)),
    ("small", res(2, 2.0, 0.5)),
    ("medium", res(2, 4.0, 0.5)),
    ("large", res(2, 8.0, 0.5)),
    ("xlarge", res(4, 16.0, 0.5)),
    ("2xlarge", res(8, 32.0, 0.5)),
];

/// Instance family category, deciding which size table applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyCategory {
    MemoryOptimized,
    GeneralPurpose,
    Burstable,
}

impl FamilyCategory {
    pub fn of(family: &str) -> FamilyCategory {
        if ["m6i", "m7i", "m6g", "m7g"].contains(&family) {
            FamilyCategory::GeneralPurpose
        } else if ["t3", "t4g"].contains(&family) {
            FamilyCategory::Burstable
        } else {
            FamilyCategory::MemoryOptimized
        }
    }

    /// Families of this category, in comparison-preference order.
    pub fn families(&self) -> &'static [&'static str] {
        match self {
            FamilyCategory::MemoryOptimized => &["r6i", "r7i", "r7g", "r6g", "r8g", "x2idn"],
            FamilyCategory::GeneralPurpose => &["m6i", "m7i", "m6g", "m7g"],
            FamilyCategory::Burstable => &["t3", "t4g"],
        }
    }

    fn size_table(&self) -> &'static [(&'static str, InstanceResources)] {
        match self {
            FamilyCategory::MemoryOptimized => R_SIZES,
            FamilyCategory::GeneralPurpose => M_SIZES,
            FamilyCategory::Burstable => T_SIZES,
        }
    }
}

/// Split an instance token into (family, size), e.g. "db.r6i.2xlarge"
/// into ("r6i", "2xlarge").
pub fn split_instance_token(token: &str) -> Option<(String, String)> {
    let caps = INSTANCE_TOKEN.captures(token)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Resource triple for an instance token, if the size is known.
pub fn instance_resources(token: &str) -> Option<InstanceResources> {
    let (family, size) = split_instance_token(token)?;
    FamilyCategory::of(&family)
        .size_table()
        .iter()
        .find(|(s, _)| *s == size)
        .map(|(_, resources)| *resources)
}

/// Same-category families for comparison, base family first, at most two.
///
/// Graviton families are skipped when the target engine does not offer
/// them.
pub fn expand_families(base_family: &str, exclude_graviton: bool) -> Vec<String> {
    let mut families = vec![base_family.to_string()];
    for candidate in FamilyCategory::of(base_family).families() {
        if families.len() >= 2 {
            break;
        }
        if *candidate == base_family {
            continue;
        }
        if exclude_graviton && GRAVITON_FAMILIES.contains(candidate) {
            continue;
        }
        families.push(candidate.to_string());
    }
    families
}

/// Smallest instance of `family` whose memory covers the requirement;
/// falls back to the family's largest size when nothing is big enough.
pub fn find_matching_instance(memory_gb: f64, family: &str) -> Option<String> {
    let table = FamilyCategory::of(family).size_table();
    table
        .iter()
        .find(|(_, resources)| resources.memory_gb >= memory_gb)
        .or_else(|| table.last())
        .map(|(size, _)| format!("db.{family}.{size}"))
}

/// Per-region storage and network rates (USD).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionRates {
    /// Block storage, per GB-month
    pub storage_per_gb: f64,
    /// Provisioned IOPS above the base allowance, per IOPS-month
    pub iops_per_unit: f64,
    /// Provisioned throughput above the base allowance, per MBps-month
    pub throughput_per_mbps: f64,
    /// Cross-zone transfer, per GB
    pub cross_az_per_gb: f64,
    /// Cross-region transfer, per GB
    pub cross_region_per_gb: f64,
}

const BASELINE_RATES: RegionRates = RegionRates {
    storage_per_gb: 0.08,
    iops_per_unit: 0.02,
    throughput_per_mbps: 0.04,
    cross_az_per_gb: 0.01,
    cross_region_per_gb: 0.02,
};

/// Rate tables injected into the cost model.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingCatalog {
    /// Fallback region when the requested region has no rate entry.
    #[serde(default = "default_region")]
    pub default_region: String,

    #[serde(default = "default_region_rates")]
    pub regions: HashMap<String, RegionRates>,

    /// Clustered storage, per GB-month (replication bundled)
    #[serde(default = "default_clustered_storage_per_gb")]
    pub clustered_storage_per_gb: f64,

    /// IOPS included with block storage before per-IOPS billing starts
    #[serde(default = "default_base_iops")]
    pub base_iops: f64,

    /// Throughput (MBps) included with block storage
    #[serde(default = "default_base_throughput_mbps")]
    pub base_throughput_mbps: f64,
}

fn default_region() -> String {
    "ap-northeast-2".to_string()
}

fn default_clustered_storage_per_gb() -> f64 {
    0.10
}

fn default_base_iops() -> f64 {
    3000.0
}

fn default_base_throughput_mbps() -> f64 {
    125.0
}

fn default_region_rates() -> HashMap<String, RegionRates> {
    let mut regions = HashMap::new();
    regions.insert("ap-northeast-2".to_string(), BASELINE_RATES);
    regions.insert("us-east-1".to_string(), BASELINE_RATES);
    regions.insert("us-west-2".to_string(), BASELINE_RATES);
    regions.insert(
        "eu-west-1".to_string(),
        RegionRates {
            storage_per_gb: 0.088,
            iops_per_unit: 0.022,
            throughput_per_mbps: 0.044,
            ..BASELINE_RATES
        },
    );
    regions.insert(
        "ap-northeast-1".to_string(),
        RegionRates {
            storage_per_gb: 0.096,
            iops_per_unit: 0.024,
            throughput_per_mbps: 0.048,
            ..BASELINE_RATES
        },
    );
    regions.insert(
        "ap-southeast-1".to_string(),
        RegionRates {
            storage_per_gb: 0.088,
            iops_per_unit: 0.022,
            throughput_per_mbps: 0.044,
            ..BASELINE_RATES
        },
    );
    regions
}

impl Default for PricingCatalog {
    fn default() -> Self {
        Self {
            default_region: default_region(),
            regions: default_region_rates(),
            clustered_storage_per_gb: default_clustered_storage_per_gb(),
            base_iops: default_base_iops(),
            base_throughput_mbps: default_base_throughput_mbps(),
        }
    }
}

impl PricingCatalog {
    /// Load the catalog, layering an optional override file and `DBCOST_`
    /// environment variables over the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, EstimatorError> {
        let mut builder =
            config::Config::builder().add_source(config::Environment::with_prefix("DBCOST"));
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let config = builder.build()?;
        Ok(config.try_deserialize().unwrap_or_default())
    }

    /// Rates for a region; an unrecognized region falls back to the
    /// default region's table.
    pub fn rates(&self, region: &str) -> RegionRates {
        self.regions
            .get(region)
            .or_else(|| self.regions.get(&self.default_region))
            .copied()
            .unwrap_or(BASELINE_RATES)
    }
}
