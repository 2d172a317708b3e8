//! Storage and network cost model
//!
//! Prices one workload size under the injected catalog. Two storage modes
//! exist: generic block storage (capacity plus excess IOPS/throughput) and
//! clustered storage (capacity only, replication bundled).

use crate::catalog::{PricingCatalog, AURORA_ENGINES};
use crate::models::Topology;

const DAYS_PER_MONTH: f64 = 30.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Monthly storage cost, split by component (USD).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StorageCost {
    pub storage: f64,
    pub iops: f64,
    pub throughput: f64,
    pub total: f64,
}

/// Monthly network cost scenarios (USD).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NetworkCost {
    pub sent_daily_gb: f64,
    pub recv_daily_gb: f64,
    pub redo_daily_gb: f64,
    /// Client traffic across zones, both directions
    pub cross_az_monthly: f64,
    /// Cross-zone plus a read replica fed over the cross-zone link
    pub replica_cross_az_monthly: f64,
    /// Cross-zone plus a read replica fed over the cross-region link
    pub replica_cross_region_monthly: f64,
}

/// Rate-parameterized cost model for one (region, engine) target.
#[derive(Debug, Clone)]
pub struct CostModel {
    catalog: PricingCatalog,
    region: String,
    engine: String,
    provisioned_iops: f64,
    provisioned_throughput_mbps: f64,
}

impl CostModel {
    pub fn new(catalog: PricingCatalog, region: &str, engine: &str) -> Self {
        Self {
            catalog,
            region: region.to_string(),
            engine: engine.to_string(),
            provisioned_iops: 0.0,
            provisioned_throughput_mbps: 0.0,
        }
    }

    /// Provisioned IOPS/throughput above the base allowance; zero means
    /// nothing provisioned beyond the bundled baseline.
    pub fn with_provisioning(mut self, iops: f64, throughput_mbps: f64) -> Self {
        self.provisioned_iops = iops;
        self.provisioned_throughput_mbps = throughput_mbps;
        self
    }

    /// Whether the target engine uses clustered storage.
    pub fn clustered_storage(&self) -> bool {
        AURORA_ENGINES.contains(&self.engine.as_str())
    }

    /// Monthly storage cost at `size_gb`.
    ///
    /// Multi-zone doubles the capacity component of block storage (the
    /// synchronous replica holds a full copy); excess IOPS and throughput
    /// are provisioned once, not per zone. Clustered storage bundles its
    /// replication, so multi-zone prices identically.
    pub fn storage_monthly(&self, size_gb: f64, topology: Topology) -> StorageCost {
        if self.clustered_storage() {
            let storage = round2(size_gb * self.catalog.clustered_storage_per_gb);
            return StorageCost {
                storage,
                iops: 0.0,
                throughput: 0.0,
                total: storage,
            };
        }

        let rates = self.catalog.rates(&self.region);
        let zone_factor = match topology {
            Topology::SingleZone => 1.0,
            Topology::MultiZone => 2.0,
        };
        let storage = round2(size_gb * rates.storage_per_gb * zone_factor);

        let excess_iops = (self.provisioned_iops - self.catalog.base_iops).max(0.0);
        let iops = round2(excess_iops * rates.iops_per_unit);

        let excess_tp = (self.provisioned_throughput_mbps - self.catalog.base_throughput_mbps)
            .max(0.0);
        let throughput = round2(excess_tp * rates.throughput_per_mbps);

        StorageCost {
            storage,
            iops,
            throughput,
            total: round2(storage + iops + throughput),
        }
    }

    /// Monthly network cost from daily byte figures.
    ///
    /// Client traffic is billed both directions at the cross-zone rate;
    /// the replica scenarios add the redo volume at the cross-zone or the
    /// cross-region rate. Multi-zone replication traffic itself is free,
    /// so the multi-zone figure equals the single-zone one.
    pub fn network_monthly(
        &self,
        sent_bytes_per_day: Option<f64>,
        recv_bytes_per_day: Option<f64>,
        redo_bytes_per_day: Option<f64>,
    ) -> NetworkCost {
        let rates = self.catalog.rates(&self.region);

        let sent_daily_gb = sent_bytes_per_day.unwrap_or(0.0) / BYTES_PER_GB;
        let recv_daily_gb = recv_bytes_per_day.unwrap_or(0.0) / BYTES_PER_GB;
        let redo_daily_gb = redo_bytes_per_day.unwrap_or(0.0) / BYTES_PER_GB;

        let client_monthly_gb = (sent_daily_gb + recv_daily_gb) * DAYS_PER_MONTH;
        let redo_monthly_gb = redo_daily_gb * DAYS_PER_MONTH;

        let cross_az = client_monthly_gb * rates.cross_az_per_gb * 2.0;

        NetworkCost {
            sent_daily_gb,
            recv_daily_gb,
            redo_daily_gb,
            cross_az_monthly: cross_az,
            replica_cross_az_monthly: cross_az + redo_monthly_gb * rates.cross_az_per_gb,
            replica_cross_region_monthly: cross_az + redo_monthly_gb * rates.cross_region_per_gb,
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PricingCatalog;

    fn block_model() -> CostModel {
        CostModel::new(PricingCatalog::default(), "ap-northeast-2", "oracle-ee")
    }

    #[test]
    fn test_block_storage_capacity_only() {
        let cost = block_model().storage_monthly(500.0, Topology::SingleZone);
        assert_eq!(cost.storage, 40.0);
        assert_eq!(cost.iops, 0.0);
        assert_eq!(cost.total, 40.0);
    }

    #[test]
    fn test_block_storage_excess_iops_and_throughput() {
        let model = block_model().with_provisioning(5000.0, 200.0);
        let cost = model.storage_monthly(500.0, Topology::SingleZone);
        assert_eq!(cost.iops, 2000.0 * 0.02);
        assert_eq!(cost.throughput, 75.0 * 0.04);
        assert_eq!(cost.total, 40.0 + 40.0 + 3.0);
    }

    #[test]
    fn test_multi_zone_doubles_capacity_component_only() {
        let model = block_model().with_provisioning(5000.0, 0.0);
        let single = model.storage_monthly(500.0, Topology::SingleZone);
        let multi = model.storage_monthly(500.0, Topology::MultiZone);
        assert_eq!(multi.storage, single.storage * 2.0);
        assert_eq!(multi.iops, single.iops);
        assert_eq!(multi.total, single.storage * 2.0 + single.iops);
    }

    #[test]
    fn test_clustered_storage_ignores_provisioning_and_topology() {
        let model = CostModel::new(
            PricingCatalog::default(),
            "ap-northeast-2",
            "aurora-postgresql",
        )
        .with_provisioning(10_000.0, 500.0);

        let single = model.storage_monthly(500.0, Topology::SingleZone);
        let multi = model.storage_monthly(500.0, Topology::MultiZone);
        assert_eq!(single.total, 50.0);
        assert_eq!(single.iops, 0.0);
        assert_eq!(single, multi);
    }

    #[test]
    fn test_network_scenarios() {
        const GB: f64 = 1024.0 * 1024.0 * 1024.0;
        let net = block_model().network_monthly(Some(10.0 * GB), Some(5.0 * GB), Some(2.0 * GB));

        // (10 + 5) GB/day × 30 × 0.01 × 2
        assert_eq!(net.cross_az_monthly, 9.0);
        // + 60 GB/month of redo at the cross-az rate
        assert_eq!(net.replica_cross_az_monthly, 9.6);
        // + 60 GB/month of redo at the cross-region rate
        assert_eq!(net.replica_cross_region_monthly, 10.2);
    }

    #[test]
    fn test_unknown_region_prices_like_default() {
        let known = block_model().storage_monthly(500.0, Topology::SingleZone);
        let unknown = CostModel::new(PricingCatalog::default(), "mars-central-1", "oracle-ee")
            .storage_monthly(500.0, Topology::SingleZone);
        assert_eq!(known, unknown);
    }
}
