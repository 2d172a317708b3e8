//! Cost projection and result assembly
//!
//! Runs the cost model across a 3-year horizon and assembles the flat
//! key/value result map the renderer consumes. Every documented key is
//! always present; missing data shows up as `"N/A"` (or `"0.00"` for
//! network figures), never as an absent key.

use std::collections::{BTreeMap, HashMap};

use chrono::Local;
use tracing::info;

use crate::catalog::{self, PricingCatalog, ORACLE_ENGINES};
use crate::cost::model::{round2, CostModel, NetworkCost, StorageCost};
use crate::models::{
    MigrationStrategy, ParsedReport, PurchaseOption, Topology,
};
use crate::pricing::QuoteSet;

const PROJECTION_YEARS: usize = 3;

/// Everything the projection needs beyond the engine's own configuration.
#[derive(Debug)]
pub struct ProjectionInput<'a> {
    pub report: &'a ParsedReport,
    pub quotes: &'a QuoteSet,
    /// family -> instance token, sized from the current server
    pub spec_instances: &'a BTreeMap<String, String>,
    /// family -> instance token, sized from the cache advice
    pub sga_instances: &'a BTreeMap<String, String>,
    pub family_a: String,
    pub family_b: Option<String>,
}

/// Builds the flat result map for one (region, engine) target.
pub struct ProjectionEngine {
    model: CostModel,
    region: String,
    engine: String,
}

/// Result map plus the raw monthly figures later passes read back.
struct ResultSink {
    data: BTreeMap<String, String>,
    raw_monthly: HashMap<String, f64>,
}

impl ResultSink {
    fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            raw_monthly: HashMap::new(),
        }
    }

    fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    fn put_money(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        self.raw_monthly.insert(key.clone(), value);
        self.data.insert(key, format_money(value));
    }

    fn raw(&self, key: &str) -> Option<f64> {
        self.raw_monthly.get(key).copied()
    }
}

impl ProjectionEngine {
    pub fn new(catalog: PricingCatalog, region: &str, engine: &str) -> Self {
        Self {
            model: CostModel::new(catalog, region, engine),
            region: region.to_string(),
            engine: engine.to_string(),
        }
    }

    /// Provisioned IOPS/throughput carried into the storage model.
    pub fn with_provisioning(mut self, iops: f64, throughput_mbps: f64) -> Self {
        self.model = self.model.with_provisioning(iops, throughput_mbps);
        self
    }

    /// Produce the full result map.
    pub fn project(&self, input: &ProjectionInput) -> BTreeMap<String, String> {
        let mut sink = ResultSink::new();
        let report = input.report;

        let mut families = vec![input.family_a.clone()];
        if let Some(b) = &input.family_b {
            families.push(b.clone());
        }

        self.fill_overview(&mut sink, input);
        self.fill_server_and_metrics(&mut sink, report);

        let db_size = report.growth.current_size_gb;
        let growth_rate = report.growth.growth_rate();
        self.fill_growth(&mut sink, report, db_size, growth_rate);

        let storage_by_year = self.fill_storage(&mut sink, db_size, growth_rate);
        let network = self.fill_network(&mut sink, report, growth_rate);

        for (prefix, instances) in [("spec", input.spec_instances), ("sga", input.sga_instances)] {
            self.fill_instance_specs(&mut sink, instances, &families, prefix);
        }
        for (prefix, instances) in [("spec", input.spec_instances), ("sga", input.sga_instances)] {
            self.fill_pricing(&mut sink, input.quotes, instances, &families, prefix);
        }

        self.fill_comparison(&mut sink, &families);
        self.fill_tco(&mut sink, &families, &storage_by_year, &network, growth_rate);
        self.fill_refactoring(&mut sink, input, &families);

        info!(
            region = %self.region,
            engine = %self.engine,
            keys = sink.data.len(),
            "cost projection complete"
        );
        sink.data
    }

    fn fill_overview(&self, sink: &mut ResultSink, input: &ProjectionInput) {
        let report = input.report;
        let today = Local::now().format("%Y-%m-%d").to_string();

        sink.put("family_a", input.family_a.clone());
        sink.put(
            "family_b",
            input.family_b.clone().unwrap_or_else(|| "N/A".to_string()),
        );
        sink.put(
            "db_name",
            report.server.db_name.clone().unwrap_or_else(|| "Unknown".to_string()),
        );
        sink.put(
            "engine_version",
            report.server.engine_version.clone().unwrap_or_else(|| "N/A".to_string()),
        );
        sink.put("aws_region", self.region.clone());
        sink.put("report_date", today.clone());
        sink.put("pricing_date", today);
    }

    fn fill_server_and_metrics(&self, sink: &mut ResultSink, report: &ParsedReport) {
        let server = &report.server;
        sink.put("cpu_cores", fmt_opt_u32(server.cpu_cores));
        sink.put("physical_memory", fmt_opt(server.physical_memory_gb));
        sink.put("db_size", fmt_opt(server.db_size_gb));
        sink.put(
            "instance_config",
            server.cluster_config.clone().unwrap_or_else(|| "N/A".to_string()),
        );

        let m = &report.metrics;
        sink.put("avg_cpu", fmt_opt(m.avg_cpu_percent));
        sink.put("peak_cpu", fmt_opt(m.peak_cpu_percent));
        sink.put("avg_cpu_per_s", fmt_opt(m.avg_cpu_per_s));
        sink.put("peak_cpu_per_s", fmt_opt(m.peak_cpu_per_s));
        sink.put("avg_iops", fmt_opt(m.avg_iops));
        sink.put("peak_iops", fmt_opt(m.peak_iops));
        sink.put("avg_memory", fmt_opt(m.avg_memory_gb));
        sink.put("peak_memory", fmt_opt(m.peak_memory_gb));

        let advice = &report.cache_advice;
        sink.put("current_sga", fmt_opt(advice.current_gb));
        sink.put("recommended_sga", fmt_opt(advice.recommended_gb));
        sink.put(
            "sga_increase_rate",
            advice
                .change_rate_percent()
                .map(|rate| fmt_num(round_to1(rate)))
                .unwrap_or_else(|| "N/A".to_string()),
        );
    }

    fn fill_growth(
        &self,
        sink: &mut ResultSink,
        report: &ParsedReport,
        db_size: Option<f64>,
        growth_rate: f64,
    ) {
        let yearly_growth_gb = report
            .growth
            .yearly_growth_gb
            .or(db_size.map(|size| size * growth_rate));
        sink.put(
            "yearly_growth",
            yearly_growth_gb
                .map(|gb| fmt_num(round_to1(gb)))
                .unwrap_or_else(|| "N/A".to_string()),
        );
        sink.put("yearly_growth_rate", fmt_num(round_to1(growth_rate * 100.0)));

        for year in 1..=PROJECTION_YEARS {
            let key = format!("db_size_{year}y");
            match db_size {
                Some(size) => {
                    let grown = size * (1.0 + growth_rate).powi(year as i32);
                    sink.put(key, fmt_num(round_to1(grown)));
                }
                None => sink.put(key, "N/A"),
            }
        }
    }

    /// Storage costs for years 0..=3 at single-zone topology, emitted per
    /// year alongside the multi-zone totals. Returns the per-year figures
    /// for TCO aggregation.
    fn fill_storage(
        &self,
        sink: &mut ResultSink,
        db_size: Option<f64>,
        growth_rate: f64,
    ) -> Vec<StorageCost> {
        let mut by_year = Vec::with_capacity(PROJECTION_YEARS + 1);

        for year in 0..=PROJECTION_YEARS {
            let size = db_size.unwrap_or(0.0) * (1.0 + growth_rate).powi(year as i32);
            let cost = self.model.storage_monthly(size, Topology::SingleZone);
            let maz = self.model.storage_monthly(size, Topology::MultiZone);

            sink.put_money(format!("stor_cost_{year}y"), cost.storage);
            sink.put_money("iops_cost", cost.iops);
            sink.put_money("throughput_cost", cost.throughput);
            sink.put_money(format!("stor_total_{year}y"), cost.total);
            sink.put_money(format!("stor_yearly_{year}y"), cost.total * 12.0);
            sink.put_money(format!("stor_maz_total_{year}y"), maz.total);

            by_year.push(cost);
        }
        by_year
    }

    fn fill_network(
        &self,
        sink: &mut ResultSink,
        report: &ParsedReport,
        growth_rate: f64,
    ) -> NetworkCost {
        let m = &report.metrics;
        let has_data = m.sent_bytes_per_day.is_some()
            || m.recv_bytes_per_day.is_some()
            || m.redo_bytes_per_day.is_some();
        let net = self.model.network_monthly(
            m.sent_bytes_per_day,
            m.recv_bytes_per_day,
            m.redo_bytes_per_day,
        );

        sink.put_money("sqlnet_recv_daily", net.recv_daily_gb);
        sink.put_money("sqlnet_sent_daily", net.sent_daily_gb);
        sink.put_money("sqlnet_recv_monthly", net.recv_daily_gb * 30.0);
        sink.put_money("sqlnet_sent_monthly", net.sent_daily_gb * 30.0);
        // No link-to-link traffic is measurable from the dump
        sink.put_money("dblink_daily", 0.0);
        sink.put_money("dblink_monthly", 0.0);
        sink.put_money("redo_daily", net.redo_daily_gb);
        sink.put_money("redo_monthly", net.redo_daily_gb * 30.0);

        let total_daily = net.sent_daily_gb + net.recv_daily_gb + net.redo_daily_gb;
        let total_monthly = total_daily * 30.0;
        sink.put_money("net_total_daily", total_daily);
        sink.put_money("net_total_monthly", total_monthly);

        sink.put_money("net_cost_cross_az", net.cross_az_monthly);
        sink.put_money("net_cost_cross_az_yearly", net.cross_az_monthly * 12.0);
        // Multi-zone replication traffic is free; client traffic is billed
        // the same, tracked under its own key
        sink.put_money("net_cost_maz_cross_az", net.cross_az_monthly);
        sink.put_money("net_cost_maz_cross_az_yearly", net.cross_az_monthly * 12.0);
        sink.put_money("net_cost_rr_cross_az", net.replica_cross_az_monthly);
        sink.put_money(
            "net_cost_rr_cross_az_yearly",
            net.replica_cross_az_monthly * 12.0,
        );
        sink.put_money("net_cost_rr_cross_region", net.replica_cross_region_monthly);
        sink.put_money(
            "net_cost_rr_cross_region_yearly",
            net.replica_cross_region_monthly * 12.0,
        );

        sink.put_money("net_monthly", net.cross_az_monthly);
        sink.put_money("net_maz_monthly", net.cross_az_monthly);
        sink.put(
            "net_scenario",
            if has_data {
                "Single-AZ (Cross-AZ App)"
            } else {
                "N/A"
            },
        );

        for year in 1..=PROJECTION_YEARS {
            let factor = (1.0 + growth_rate).powi(year as i32);
            sink.put_money(format!("net_total_monthly_{year}y"), total_monthly * factor);
            sink.put_money(
                format!("net_cost_cross_az_{year}y"),
                net.cross_az_monthly * factor,
            );
            sink.put_money(
                format!("net_cost_cross_az_yearly_{year}y"),
                net.cross_az_monthly * factor * 12.0,
            );
        }

        net
    }

    fn fill_instance_specs(
        &self,
        sink: &mut ResultSink,
        instances: &BTreeMap<String, String>,
        families: &[String],
        prefix: &str,
    ) {
        for family in families {
            let key_prefix = format!("{prefix}_{family}");
            let inst = instances.get(family);
            sink.put(
                format!("{key_prefix}_instance"),
                inst.cloned().unwrap_or_else(|| "N/A".to_string()),
            );

            match inst.and_then(|token| catalog::instance_resources(token)) {
                Some(resources) => {
                    sink.put(format!("{key_prefix}_vcpu"), resources.vcpu.to_string());
                    sink.put(format!("{key_prefix}_memory"), fmt_num(resources.memory_gb));
                    sink.put(
                        format!("{key_prefix}_network"),
                        fmt_num(resources.network_gbps),
                    );
                }
                None => {
                    sink.put(format!("{key_prefix}_vcpu"), "N/A");
                    sink.put(format!("{key_prefix}_memory"), "N/A");
                    sink.put(format!("{key_prefix}_network"), "N/A");
                }
            }
        }
    }

    /// Compute + storage + network totals per (family, option, topology).
    fn fill_pricing(
        &self,
        sink: &mut ResultSink,
        quotes: &QuoteSet,
        instances: &BTreeMap<String, String>,
        families: &[String],
        prefix: &str,
    ) {
        let stor_monthly = sink.raw("stor_total_0y").unwrap_or(0.0);
        let stor_maz_monthly = sink.raw("stor_maz_total_0y").unwrap_or(0.0);
        let net_monthly = sink.raw("net_monthly").unwrap_or(0.0);
        let net_maz_monthly = sink.raw("net_maz_monthly").unwrap_or(0.0);

        for family in families {
            let inst = instances.get(family);
            let key_base = format!("{prefix}_{family}");

            for option in PurchaseOption::ALL {
                let suffix = option.key_suffix();

                let single = inst.and_then(|inst| {
                    quotes.monthly_cost(
                        inst,
                        MigrationStrategy::Replatform,
                        Topology::SingleZone,
                        option,
                    )
                });
                put_compute_total(
                    sink,
                    &format!("{key_base}_{suffix}"),
                    single,
                    stor_monthly,
                    net_monthly,
                );

                let multi = inst.and_then(|inst| {
                    quotes.monthly_cost(
                        inst,
                        MigrationStrategy::Replatform,
                        Topology::MultiZone,
                        option,
                    )
                });
                put_compute_total(
                    sink,
                    &format!("{key_base}_maz_{suffix}"),
                    multi,
                    stor_maz_monthly,
                    net_maz_monthly,
                );
            }
        }
    }

    fn fill_comparison(&self, sink: &mut ResultSink, families: &[String]) {
        for prefix in ["spec", "sga"] {
            for family in families {
                for option in PurchaseOption::ALL {
                    let suffix = option.key_suffix();
                    let src = format!("{prefix}_{family}_{suffix}_total_yearly");
                    let value = sink
                        .data
                        .get(&src)
                        .cloned()
                        .unwrap_or_else(|| "N/A".to_string());
                    sink.put(format!("comp_{prefix}_{family}_{suffix}"), value);
                }
            }
        }
    }

    /// 3-year TCO: 36 months of compute plus per-year storage and network
    /// recomputed at each year's grown size. A missing compute quote makes
    /// the whole row unavailable.
    fn fill_tco(
        &self,
        sink: &mut ResultSink,
        families: &[String],
        storage_by_year: &[StorageCost],
        network: &NetworkCost,
        growth_rate: f64,
    ) {
        let yearly_stor: Vec<f64> = (1..=PROJECTION_YEARS)
            .map(|year| storage_by_year[year].total * 12.0)
            .collect();
        let stor_3yr_total: f64 = yearly_stor.iter().sum();

        let yearly_net: Vec<f64> = (1..=PROJECTION_YEARS)
            .map(|year| {
                network.cross_az_monthly * (1.0 + growth_rate).powi(year as i32) * 12.0
            })
            .collect();
        let net_3yr_total: f64 = yearly_net.iter().sum();

        let tco_options = [
            ("od", PurchaseOption::OnDemand),
            ("ri1", PurchaseOption::Ri1yrAllUpfront),
            ("ri3", PurchaseOption::Ri3yrAllUpfront),
        ];

        for prefix in ["spec", "sga"] {
            for family in families {
                for (tco_suffix, option) in tco_options {
                    let monthly_key =
                        format!("{prefix}_{family}_{}_monthly", option.key_suffix());
                    let dst = format!("tco_{prefix}_{family}_{tco_suffix}");
                    match sink.raw(&monthly_key) {
                        Some(monthly) => {
                            let tco = monthly * 12.0 * 3.0 + stor_3yr_total + net_3yr_total;
                            sink.put_money(dst, tco);
                        }
                        None => sink.put(dst, "N/A"),
                    }
                }
            }
        }

        // Detail rows use the best-case scenario: cache-sized instance on
        // the 3-year all-upfront commitment
        for family in families {
            let inst_monthly = sink.raw(&format!("sga_{family}_ri3au_monthly"));

            for year in 1..=PROJECTION_YEARS {
                let stor_yr = yearly_stor[year - 1];
                let net_yr = yearly_net[year - 1];
                sink.put_money(format!("tco_detail_stor_{year}y"), stor_yr);
                sink.put_money(format!("tco_detail_net_{year}y"), net_yr);

                match inst_monthly {
                    Some(monthly) => {
                        let inst_yr = monthly * 12.0;
                        sink.put_money(format!("tco_detail_{family}_inst_{year}y"), inst_yr);
                        sink.put_money(
                            format!("tco_detail_{family}_{year}y"),
                            inst_yr + stor_yr + net_yr,
                        );
                    }
                    None => {
                        sink.put(format!("tco_detail_{family}_inst_{year}y"), "N/A");
                        sink.put(format!("tco_detail_{family}_{year}y"), "N/A");
                    }
                }
            }

            sink.put_money("tco_detail_stor_total", stor_3yr_total);
            sink.put_money("tco_detail_net_total", net_3yr_total);
            match inst_monthly {
                Some(monthly) => {
                    let inst_3yr = monthly * 12.0 * 3.0;
                    sink.put_money(format!("tco_detail_{family}_inst_total"), inst_3yr);
                    sink.put_money(
                        format!("tco_detail_{family}_total"),
                        inst_3yr + stor_3yr_total + net_3yr_total,
                    );
                }
                None => {
                    sink.put(format!("tco_detail_{family}_inst_total"), "N/A");
                    sink.put(format!("tco_detail_{family}_total"), "N/A");
                }
            }
        }
    }

    /// Replatform vs refactor comparison on the cache-sized instances,
    /// single-zone. Only meaningful for source engines with a cheaper
    /// refactor target.
    fn fill_refactoring(
        &self,
        sink: &mut ResultSink,
        input: &ProjectionInput,
        families: &[String],
    ) {
        let applicable = ORACLE_ENGINES.contains(&self.engine.as_str());
        sink.put(
            "refac_section_visible",
            if applicable { "true" } else { "false" },
        );

        let stor_monthly = sink.raw("stor_total_0y").unwrap_or(0.0);
        let net_monthly = sink.raw("net_monthly").unwrap_or(0.0);

        for family in families {
            let inst = input.sga_instances.get(family);

            for option in PurchaseOption::ALL {
                let suffix = option.key_suffix();
                let monthly_key = format!("refac_{family}_{suffix}_monthly");
                let yearly_key = format!("refac_{family}_{suffix}_total_yearly");
                let savings_key = format!("refac_{family}_{suffix}_savings");
                let rate_key = format!("refac_{family}_{suffix}_savings_rate");

                let refac_monthly = if applicable {
                    inst.and_then(|inst| {
                        input.quotes.monthly_cost(
                            inst,
                            MigrationStrategy::Refactor,
                            Topology::SingleZone,
                            option,
                        )
                    })
                } else {
                    None
                };

                let Some(refac_monthly) = refac_monthly else {
                    sink.put(monthly_key, "N/A");
                    sink.put(yearly_key, "N/A");
                    sink.put(savings_key, "N/A");
                    sink.put(rate_key, "N/A");
                    continue;
                };

                let refac_total_yearly = (refac_monthly + stor_monthly + net_monthly) * 12.0;
                sink.put_money(monthly_key, round2(refac_monthly));
                sink.put_money(yearly_key, refac_total_yearly);

                let replat_yearly = sink.raw(&format!("sga_{family}_{suffix}_total_yearly"));
                match replat_yearly {
                    Some(replat) if replat > 0.0 => {
                        let savings = replat - refac_total_yearly;
                        sink.put_money(savings_key, savings);
                        sink.put(rate_key, format!("{:.1}", savings / replat * 100.0));
                    }
                    _ => {
                        sink.put(savings_key, "N/A");
                        sink.put(rate_key, "N/A");
                    }
                }
            }
        }
    }
}

fn put_compute_total(
    sink: &mut ResultSink,
    key_base: &str,
    compute_monthly: Option<f64>,
    storage_monthly: f64,
    network_monthly: f64,
) {
    match compute_monthly {
        Some(monthly) => {
            let monthly = round2(monthly);
            let total_monthly = monthly + storage_monthly + network_monthly;
            sink.put_money(format!("{key_base}_monthly"), monthly);
            sink.put_money(format!("{key_base}_total_monthly"), total_monthly);
            sink.put_money(format!("{key_base}_total_yearly"), total_monthly * 12.0);
        }
        None => {
            sink.put(format!("{key_base}_monthly"), "N/A");
            sink.put(format!("{key_base}_total_monthly"), "N/A");
            sink.put(format!("{key_base}_total_yearly"), "N/A");
        }
    }
}

/// Two decimals with thousands separators, e.g. `12,345.60`.
fn format_money(value: f64) -> String {
    let negative = value < 0.0;
    let text = format!("{:.2}", value.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{grouped}.{frac_part}", if negative { "-" } else { "" })
}

fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(fmt_num).unwrap_or_else(|| "N/A".to_string())
}

fn fmt_opt_u32(value: Option<u32>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn round_to1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
