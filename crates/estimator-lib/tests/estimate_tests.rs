//! End-to-end tests: dump files on disk through parsing, quoting and
//! projection.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use estimator_lib::catalog::PricingCatalog;
use estimator_lib::{
    Estimator, InstanceSpec, MigrationStrategy, PriceQuote, PurchaseOption, QuoteGatherer,
    QuoteSource, ReportParser,
};

const DUMP: &str = "\
~~BEGIN-OS-INFORMATION~~
STAT_NAME            STAT_VALUE
-------------------- ----------
DB_NAME              PRODDB
VERSION              19.0.0.0.0
NUM_CPU_CORES        16
NUM_CPUS             32
PHYSICAL_MEMORY_GB   256
TOTAL_DB_SIZE_GB     500
INSTANCES            1
~~END-OS-INFORMATION~~
~~BEGIN-MAIN-METRICS~~
snap dur_m end             inst os_cpu os_cpu_max cpu_per_s read_iops write_iops redo_mb_s
---- ----- --------------- ---- ------ ---------- --------- --------- ---------- ---------
1    60    26/01/15 09:00  1    40.0   70.0       10.0      700       300        0.5
2    60    26/01/15 10:00  1    60.0   80.0       20.0      900       600        1.5
~~END-MAIN-METRICS~~
";

const RECOMMENDATION: &str = "\
## Assessment Summary

**Recommended Target**: RDS for Oracle EE

| **Instance Type** | db.r6i.8xlarge | db.r6i.4xlarge |
";

fn write_file(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

/// Flat-rate source: every lookup succeeds, refactor targets priced lower.
struct FlatRates;

#[async_trait]
impl QuoteSource for FlatRates {
    async fn fetch(
        &self,
        spec: &InstanceSpec,
        option: PurchaseOption,
    ) -> Result<Option<PriceQuote>> {
        let quote = match (spec.strategy, option) {
            (MigrationStrategy::Replatform, PurchaseOption::OnDemand) => {
                PriceQuote::reserved(spec.clone(), option, 0.0, 1000.0)
            }
            (MigrationStrategy::Replatform, _) => {
                PriceQuote::reserved(spec.clone(), option, 0.0, 700.0)
            }
            (MigrationStrategy::Refactor, _) => {
                PriceQuote::reserved(spec.clone(), option, 0.0, 365.0)
            }
        };
        Ok(Some(quote))
    }
}

/// Source with no data at all.
struct NoRates;

#[async_trait]
impl QuoteSource for NoRates {
    async fn fetch(&self, _: &InstanceSpec, _: PurchaseOption) -> Result<Option<PriceQuote>> {
        Ok(None)
    }
}

fn estimator(source: Arc<dyn QuoteSource>) -> Estimator {
    Estimator::new(
        PricingCatalog::default(),
        QuoteGatherer::new(source),
        None,
    )
}

#[tokio::test]
async fn test_full_pipeline_from_files() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "awr_node1.out", DUMP);
    write_file(dir.path(), "migration_recommendation.md", RECOMMENDATION);

    let report = ReportParser::new().parse(dir.path());
    let estimate = estimator(Arc::new(FlatRates)).estimate(&report).await;

    assert_eq!(estimate.engine, "oracle-ee");
    assert_eq!(estimate.region, "ap-northeast-2");
    assert_eq!(estimate.family_a, "r6i");
    // graviton families are skipped for the managed Oracle target
    assert_eq!(estimate.family_b.as_deref(), Some("r7i"));

    let values = &estimate.values;
    assert_eq!(values["db_name"], "PRODDB");
    assert_eq!(values["engine_version"], "19.0.0.0.0");
    // member averages across the two snapshots
    assert_eq!(values["avg_cpu"], "50");
    assert_eq!(values["peak_cpu"], "80");
    assert_eq!(values["avg_iops"], "1250");

    // instance sizing from the recommendation file
    assert_eq!(values["spec_r6i_instance"], "db.r6i.8xlarge");
    assert_eq!(values["sga_r6i_instance"], "db.r6i.4xlarge");
    assert_eq!(values["spec_r7i_instance"], "db.r7i.8xlarge");

    // 500 GB at the default region block rate
    assert_eq!(values["stor_total_0y"], "40.00");
    assert_eq!(values["stor_maz_total_0y"], "80.00");

    // 1000 compute + 40 storage, no network data
    assert_eq!(values["spec_r6i_od_monthly"], "1,000.00");
    assert_eq!(values["spec_r6i_od_total_monthly"], "1,040.00");
    assert_eq!(values["net_monthly"], "0.00");
    assert_eq!(values["net_scenario"], "N/A");

    assert_eq!(values["refac_section_visible"], "true");
}

#[tokio::test]
async fn test_refactoring_savings_from_files() {
    let dir = tempfile::tempdir().unwrap();
    // no TOTAL_DB_SIZE_GB, so storage contributes nothing
    write_file(
        dir.path(),
        "awr.out",
        "\
~~BEGIN-OS-INFORMATION~~
DB_NAME              PRODDB
~~END-OS-INFORMATION~~
",
    );
    write_file(dir.path(), "migration_recommendation.md", RECOMMENDATION);

    let report = ReportParser::new().parse(dir.path());
    let estimate = estimator(Arc::new(FlatRates)).estimate(&report).await;
    let values = &estimate.values;

    // replatform 1000/month vs refactor 365/month, compute only
    assert_eq!(values["sga_r6i_od_total_yearly"], "12,000.00");
    assert_eq!(values["refac_r6i_od_total_yearly"], "4,380.00");
    assert_eq!(values["refac_r6i_od_savings"], "7,620.00");
    assert_eq!(values["refac_r6i_od_savings_rate"], "63.5");
}

#[tokio::test]
async fn test_unavailable_prices_propagate_to_every_derived_key() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "awr.out", DUMP);
    write_file(dir.path(), "migration_recommendation.md", RECOMMENDATION);

    let report = ReportParser::new().parse(dir.path());
    let estimate = estimator(Arc::new(NoRates)).estimate(&report).await;
    let values = &estimate.values;

    for option in PurchaseOption::ALL {
        let suffix = option.key_suffix();
        assert_eq!(values[&format!("spec_r6i_{suffix}_monthly")], "N/A");
        assert_eq!(values[&format!("sga_r6i_{suffix}_total_yearly")], "N/A");
        assert_eq!(values[&format!("refac_r6i_{suffix}_savings")], "N/A");
    }
    assert_eq!(values["tco_sga_r6i_ri3"], "N/A");
    assert_eq!(values["tco_detail_r6i_total"], "N/A");
    assert_eq!(values["comp_spec_r6i_od"], "N/A");

    // storage and growth figures never depend on compute quotes
    assert_eq!(values["stor_total_0y"], "40.00");
    assert_eq!(values["db_size_1y"], "575");
}

#[tokio::test]
async fn test_provisioned_iops_make_growth_nonlinear() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "awr.out", DUMP);

    let report = ReportParser::new().parse(dir.path());
    let estimate = estimator(Arc::new(NoRates))
        .with_provisioning(5000.0, 0.0)
        .estimate(&report)
        .await;
    let values = &estimate.values;

    // capacity grows 15%/year, the excess-IOPS charge does not
    assert_eq!(values["stor_total_0y"], "80.00");
    assert_eq!(values["stor_total_1y"], "86.00");
    let year = |key: &str| values[key].replace(',', "").parse::<f64>().unwrap();
    assert!(year("stor_total_2y") < year("stor_total_0y") * 1.15f64.powi(2));
}
