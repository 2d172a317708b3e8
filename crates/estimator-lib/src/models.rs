//! Core data models for the migration cost estimator

use serde::{Deserialize, Serialize};

/// Yearly storage growth assumed when no source supplies a rate.
pub const DEFAULT_GROWTH_RATE_PERCENT: f64 = 15.0;

/// Billing hours per month used when amortizing hourly rates.
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Migration strategy for a target instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStrategy {
    /// Keep the source engine on the managed service
    Replatform,
    /// Move to a different (cheaper) target engine
    Refactor,
}

/// Deployment topology of a target instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    #[serde(rename = "Single-AZ")]
    SingleZone,
    #[serde(rename = "Multi-AZ")]
    MultiZone,
}

impl Topology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::SingleZone => "Single-AZ",
            Topology::MultiZone => "Multi-AZ",
        }
    }
}

/// Purchase option for a price quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOption {
    OnDemand,
    Ri1yrNoUpfront,
    Ri1yrAllUpfront,
    Ri3yrNoUpfront,
    Ri3yrAllUpfront,
}

impl PurchaseOption {
    /// All options gathered for a cost report, in display order.
    pub const ALL: [PurchaseOption; 5] = [
        PurchaseOption::OnDemand,
        PurchaseOption::Ri1yrNoUpfront,
        PurchaseOption::Ri1yrAllUpfront,
        PurchaseOption::Ri3yrNoUpfront,
        PurchaseOption::Ri3yrAllUpfront,
    ];

    /// Short suffix used in result keys (`od`, `ri1nu`, ...).
    pub fn key_suffix(&self) -> &'static str {
        match self {
            PurchaseOption::OnDemand => "od",
            PurchaseOption::Ri1yrNoUpfront => "ri1nu",
            PurchaseOption::Ri1yrAllUpfront => "ri1au",
            PurchaseOption::Ri3yrNoUpfront => "ri3nu",
            PurchaseOption::Ri3yrAllUpfront => "ri3au",
        }
    }

    /// Commitment length in months; `None` for on-demand.
    pub fn term_months(&self) -> Option<u32> {
        match self {
            PurchaseOption::OnDemand => None,
            PurchaseOption::Ri1yrNoUpfront | PurchaseOption::Ri1yrAllUpfront => Some(12),
            PurchaseOption::Ri3yrNoUpfront | PurchaseOption::Ri3yrAllUpfront => Some(36),
        }
    }
}

/// Static server attributes extracted from the instrumentation dump.
///
/// Every field is optional: a field stays `None` until the first source
/// that supplies it, and later sources never overwrite it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSpec {
    pub db_name: Option<String>,
    pub engine_version: Option<String>,
    pub cpu_cores: Option<u32>,
    pub logical_cpus: Option<u32>,
    pub physical_memory_gb: Option<f64>,
    pub db_size_gb: Option<f64>,
    /// Human-readable cluster configuration, e.g. "2 (clustered)"
    pub cluster_config: Option<String>,
}

impl ServerSpec {
    /// First-wins merge: `first` keeps every field it already has,
    /// `second` only fills the gaps.
    pub fn merge(first: Self, second: Self) -> Self {
        Self {
            db_name: first.db_name.or(second.db_name),
            engine_version: first.engine_version.or(second.engine_version),
            cpu_cores: first.cpu_cores.or(second.cpu_cores),
            logical_cpus: first.logical_cpus.or(second.logical_cpus),
            physical_memory_gb: first.physical_memory_gb.or(second.physical_memory_gb),
            db_size_gb: first.db_size_gb.or(second.db_size_gb),
            cluster_config: first.cluster_config.or(second.cluster_config),
        }
    }
}

/// Aggregated workload metrics.
///
/// The three byte-rate fields are always bytes per calendar day; the
/// parser converts from the dump's per-window megabyte figures before
/// anything is stored here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub avg_cpu_percent: Option<f64>,
    pub peak_cpu_percent: Option<f64>,
    pub avg_cpu_per_s: Option<f64>,
    pub peak_cpu_per_s: Option<f64>,
    pub avg_iops: Option<f64>,
    pub peak_iops: Option<f64>,
    pub avg_memory_gb: Option<f64>,
    pub peak_memory_gb: Option<f64>,
    pub sent_bytes_per_day: Option<f64>,
    pub recv_bytes_per_day: Option<f64>,
    pub redo_bytes_per_day: Option<f64>,
}

impl PerformanceMetrics {
    pub fn merge(first: Self, second: Self) -> Self {
        Self {
            avg_cpu_percent: first.avg_cpu_percent.or(second.avg_cpu_percent),
            peak_cpu_percent: first.peak_cpu_percent.or(second.peak_cpu_percent),
            avg_cpu_per_s: first.avg_cpu_per_s.or(second.avg_cpu_per_s),
            peak_cpu_per_s: first.peak_cpu_per_s.or(second.peak_cpu_per_s),
            avg_iops: first.avg_iops.or(second.avg_iops),
            peak_iops: first.peak_iops.or(second.peak_iops),
            avg_memory_gb: first.avg_memory_gb.or(second.avg_memory_gb),
            peak_memory_gb: first.peak_memory_gb.or(second.peak_memory_gb),
            sent_bytes_per_day: first.sent_bytes_per_day.or(second.sent_bytes_per_day),
            recv_bytes_per_day: first.recv_bytes_per_day.or(second.recv_bytes_per_day),
            redo_bytes_per_day: first.redo_bytes_per_day.or(second.redo_bytes_per_day),
        }
    }
}

/// Buffer-cache sizing advice extracted from the dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSizingAdvice {
    pub current_gb: Option<f64>,
    pub recommended_gb: Option<f64>,
}

impl CacheSizingAdvice {
    pub fn merge(first: Self, second: Self) -> Self {
        Self {
            current_gb: first.current_gb.or(second.current_gb),
            recommended_gb: first.recommended_gb.or(second.recommended_gb),
        }
    }

    /// Percentage change from current to recommended size.
    ///
    /// Always recomputed from the two sizes; a figure carried in from a
    /// free-text source is never trusted over the derived one.
    pub fn change_rate_percent(&self) -> Option<f64> {
        match (self.current_gb, self.recommended_gb) {
            (Some(cur), Some(rec)) if cur > 0.0 => Some((rec - cur) / cur * 100.0),
            _ => None,
        }
    }
}

/// Storage size and growth assumptions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageGrowth {
    pub current_size_gb: Option<f64>,
    pub yearly_growth_gb: Option<f64>,
    pub yearly_growth_rate_percent: Option<f64>,
}

impl StorageGrowth {
    pub fn merge(first: Self, second: Self) -> Self {
        Self {
            current_size_gb: first.current_size_gb.or(second.current_size_gb),
            yearly_growth_gb: first.yearly_growth_gb.or(second.yearly_growth_gb),
            yearly_growth_rate_percent: first
                .yearly_growth_rate_percent
                .or(second.yearly_growth_rate_percent),
        }
    }

    /// Growth rate as a fraction, defaulting to 15%/year.
    pub fn growth_rate(&self) -> f64 {
        self.yearly_growth_rate_percent
            .unwrap_or(DEFAULT_GROWTH_RATE_PERCENT)
            / 100.0
    }
}

/// Everything the parser can extract from one input path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedReport {
    pub server: ServerSpec,
    pub metrics: PerformanceMetrics,
    pub cache_advice: CacheSizingAdvice,
    pub growth: StorageGrowth,
    /// Target engine code from the recommendation file, e.g. "aurora-postgresql"
    pub target_engine: Option<String>,
    /// Instance recommendation derived from current server sizing
    pub instance_by_size: Option<String>,
    /// Instance recommendation derived from cache sizing advice
    pub instance_by_cache: Option<String>,
}

impl ParsedReport {
    pub fn merge(first: Self, second: Self) -> Self {
        Self {
            server: ServerSpec::merge(first.server, second.server),
            metrics: PerformanceMetrics::merge(first.metrics, second.metrics),
            cache_advice: CacheSizingAdvice::merge(first.cache_advice, second.cache_advice),
            growth: StorageGrowth::merge(first.growth, second.growth),
            target_engine: first.target_engine.or(second.target_engine),
            instance_by_size: first.instance_by_size.or(second.instance_by_size),
            instance_by_cache: first.instance_by_cache.or(second.instance_by_cache),
        }
    }

    /// Keep the server-level data size and the growth record's current
    /// size in sync: whichever was populated first propagates to the other.
    pub fn normalized(mut self) -> Self {
        match (self.server.db_size_gb, self.growth.current_size_gb) {
            (Some(size), None) => self.growth.current_size_gb = Some(size),
            (None, Some(size)) => self.server.db_size_gb = Some(size),
            _ => {}
        }
        self
    }
}

/// Lookup key for a price quote; immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub instance_type: String,
    pub region: String,
    pub engine: String,
    pub strategy: MigrationStrategy,
    pub topology: Topology,
}

/// One (instance, purchase option) price quote.
///
/// Monthly and annual figures are derived from the raw rate fields at
/// construction time by a fixed formula per purchase option; callers never
/// supply them independently except through the reservation-offering
/// fallback constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub spec: InstanceSpec,
    pub option: PurchaseOption,
    pub hourly_rate: Option<f64>,
    pub upfront_fee: Option<f64>,
    pub monthly_fee: Option<f64>,
    pub monthly_cost: Option<f64>,
    pub annual_cost: Option<f64>,
    pub available: bool,
}

impl PriceQuote {
    /// On-demand quote: monthly = hourly × 730, annual = monthly × 12.
    pub fn on_demand(spec: InstanceSpec, hourly_rate: f64) -> Self {
        let monthly = hourly_rate * HOURS_PER_MONTH;
        Self {
            spec,
            option: PurchaseOption::OnDemand,
            hourly_rate: Some(hourly_rate),
            upfront_fee: None,
            monthly_fee: None,
            monthly_cost: Some(monthly),
            annual_cost: Some(monthly * 12.0),
            available: true,
        }
    }

    /// Reserved quote: the upfront fee is amortized over the commitment
    /// term and added to the recurring monthly fee.
    pub fn reserved(
        spec: InstanceSpec,
        option: PurchaseOption,
        upfront_fee: f64,
        monthly_fee: f64,
    ) -> Self {
        let term = option.term_months().unwrap_or(12) as f64;
        let monthly = monthly_fee + upfront_fee / term;
        Self {
            spec,
            option,
            hourly_rate: None,
            upfront_fee: Some(upfront_fee),
            monthly_fee: Some(monthly_fee),
            monthly_cost: Some(monthly),
            annual_cost: Some(monthly * 12.0),
            available: true,
        }
    }

    /// Quote reconstructed from a reservation offering (fallback source):
    /// a one-time fixed price plus an effective hourly rate, converted to
    /// the same shape with availability flipped back on.
    pub fn from_offering(
        spec: InstanceSpec,
        option: PurchaseOption,
        fixed_price: f64,
        effective_hourly: f64,
    ) -> Self {
        Self::reserved(spec, option, fixed_price, effective_hourly * HOURS_PER_MONTH)
    }

    /// Placeholder for a lookup that returned no data.
    pub fn unavailable(spec: InstanceSpec, option: PurchaseOption) -> Self {
        Self {
            spec,
            option,
            hourly_rate: None,
            upfront_fee: None,
            monthly_fee: None,
            monthly_cost: None,
            annual_cost: None,
            available: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(instance: &str) -> InstanceSpec {
        InstanceSpec {
            instance_type: instance.to_string(),
            region: "ap-northeast-2".to_string(),
            engine: "oracle-ee".to_string(),
            strategy: MigrationStrategy::Replatform,
            topology: Topology::SingleZone,
        }
    }

    #[test]
    fn test_first_wins_merge_order() {
        let a = ServerSpec {
            db_name: Some("X".to_string()),
            ..Default::default()
        };
        let b = ServerSpec {
            db_name: Some("Y".to_string()),
            cpu_cores: Some(8),
            ..Default::default()
        };

        let ab = ServerSpec::merge(a.clone(), b.clone());
        assert_eq!(ab.db_name.as_deref(), Some("X"));
        assert_eq!(ab.cpu_cores, Some(8));

        let ba = ServerSpec::merge(b, a);
        assert_eq!(ba.db_name.as_deref(), Some("Y"));
    }

    #[test]
    fn test_on_demand_cost_derivation() {
        let quote = PriceQuote::on_demand(spec("db.r6i.xlarge"), 1.0);
        assert_eq!(quote.monthly_cost, Some(730.0));
        assert_eq!(quote.annual_cost, Some(8760.0));
        assert!(quote.available);
    }

    #[test]
    fn test_reserved_cost_amortizes_upfront() {
        let quote = PriceQuote::reserved(
            spec("db.r6i.xlarge"),
            PurchaseOption::Ri3yrAllUpfront,
            3600.0,
            100.0,
        );
        // 3600 over 36 months = 100/month on top of the recurring fee
        assert_eq!(quote.monthly_cost, Some(200.0));
        assert_eq!(quote.annual_cost, Some(2400.0));
    }

    #[test]
    fn test_offering_fallback_matches_reserved_shape() {
        let quote = PriceQuote::from_offering(
            spec("db.r6i.xlarge"),
            PurchaseOption::Ri1yrNoUpfront,
            0.0,
            0.5,
        );
        assert!(quote.available);
        assert_eq!(quote.monthly_cost, Some(365.0));
    }

    #[test]
    fn test_cache_advice_change_is_recomputed() {
        let advice = CacheSizingAdvice {
            current_gb: Some(40.0),
            recommended_gb: Some(50.0),
        };
        assert_eq!(advice.change_rate_percent(), Some(25.0));

        let missing = CacheSizingAdvice {
            current_gb: Some(0.0),
            recommended_gb: Some(50.0),
        };
        assert_eq!(missing.change_rate_percent(), None);
    }

    #[test]
    fn test_db_size_propagates_both_ways() {
        let from_server = ParsedReport {
            server: ServerSpec {
                db_size_gb: Some(500.0),
                ..Default::default()
            },
            ..Default::default()
        }
        .normalized();
        assert_eq!(from_server.growth.current_size_gb, Some(500.0));

        let from_growth = ParsedReport {
            growth: StorageGrowth {
                current_size_gb: Some(250.0),
                ..Default::default()
            },
            ..Default::default()
        }
        .normalized();
        assert_eq!(from_growth.server.db_size_gb, Some(250.0));
    }

    #[test]
    fn test_default_growth_rate() {
        assert_eq!(StorageGrowth::default().growth_rate(), 0.15);
        let explicit = StorageGrowth {
            yearly_growth_rate_percent: Some(10.0),
            ..Default::default()
        };
        assert_eq!(explicit.growth_rate(), 0.10);
    }
}
