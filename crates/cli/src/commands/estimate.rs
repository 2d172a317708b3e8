//! Full estimation command

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use estimator_lib::catalog::PricingCatalog;
use estimator_lib::{Estimate, Estimator, PurchaseOption, QuoteGatherer, ReportParser};

use crate::output::{format_currency, print_info, print_warning, OutputFormat};
use crate::quotes::{FileQuoteSource, FileReservationSource, QuoteFile};

/// Overrides applied on top of what the input files provide.
#[derive(Debug, Default)]
pub struct EstimateOverrides {
    pub region: Option<String>,
    pub engine: Option<String>,
    pub growth_rate_percent: Option<f64>,
    pub provisioned_iops: Option<f64>,
    pub provisioned_throughput_mbps: Option<f64>,
}

/// Row in the per-family pricing table
#[derive(Tabled)]
struct PricingRow {
    #[tabled(rename = "Purchase Option")]
    option: String,
    #[tabled(rename = "Instance/Month")]
    monthly: String,
    #[tabled(rename = "Total/Month")]
    total_monthly: String,
    #[tabled(rename = "Total/Year")]
    total_yearly: String,
    #[tabled(rename = "Multi-AZ Total/Month")]
    maz_total_monthly: String,
}

pub async fn run(
    input: &Path,
    quotes_path: &Path,
    catalog_path: Option<&Path>,
    overrides: EstimateOverrides,
    format: OutputFormat,
) -> Result<()> {
    let catalog = PricingCatalog::load(catalog_path).context("loading pricing catalog")?;
    let quote_file = QuoteFile::load(quotes_path)
        .with_context(|| format!("loading quotes from {}", quotes_path.display()))?;

    let mut report = ReportParser::new().parse(input);
    if let Some(engine) = &overrides.engine {
        report.target_engine = Some(engine.clone());
    }
    if let Some(rate) = overrides.growth_rate_percent {
        report.growth.yearly_growth_rate_percent = Some(rate);
    }

    let gatherer = QuoteGatherer::new(Arc::new(FileQuoteSource::new(&quote_file)))
        .with_reservation_fallback(Arc::new(FileReservationSource::new(&quote_file)));
    let estimator = Estimator::new(catalog, gatherer, overrides.region.as_deref())
        .with_provisioning(
            overrides.provisioned_iops.unwrap_or(0.0),
            overrides.provisioned_throughput_mbps.unwrap_or(0.0),
        );

    let estimate = estimator.estimate(&report).await;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&estimate.values)?);
        }
        OutputFormat::Table => print_estimate(&estimate),
    }
    Ok(())
}

fn print_estimate(estimate: &Estimate) {
    let values = &estimate.values;
    let get = |key: &str| values.get(key).cloned().unwrap_or_else(|| "N/A".to_string());

    println!("{}", "Migration Cost Estimate".bold());
    println!("{}", "=".repeat(60));
    println!("Database:               {}", get("db_name").cyan());
    println!("Engine version:         {}", get("engine_version"));
    println!("Target engine:          {}", estimate.engine.cyan());
    println!("Region:                 {}", estimate.region);
    println!("Report date:            {}", get("report_date"));
    println!();

    print_server_section(values);
    print_workload_section(values);
    print_storage_section(values);
    print_network_section(values);

    let mut families = vec![estimate.family_a.clone()];
    if let Some(b) = &estimate.family_b {
        families.push(b.clone());
    }
    for family in &families {
        print_family_pricing(values, family);
    }
    print_tco_section(values, &families);
    print_refactor_section(values, &families);
}

fn print_server_section(values: &BTreeMap<String, String>) {
    let get = |key: &str| values.get(key).cloned().unwrap_or_else(|| "N/A".to_string());

    println!("{}", "Current Server".bold());
    println!("{}", "-".repeat(60));
    println!("CPU cores:              {}", get("cpu_cores"));
    println!("Physical memory (GB):   {}", get("physical_memory"));
    println!("Database size (GB):     {}", get("db_size"));
    println!("Configuration:          {}", get("instance_config"));
    println!();
}

fn print_workload_section(values: &BTreeMap<String, String>) {
    let get = |key: &str| values.get(key).cloned().unwrap_or_else(|| "N/A".to_string());

    println!("{}", "Measured Workload".bold());
    println!("{}", "-".repeat(60));
    println!(
        "CPU utilization:        {} % avg / {} % peak",
        get("avg_cpu"),
        get("peak_cpu")
    );
    println!(
        "CPU seconds/s:          {} avg / {} peak",
        get("avg_cpu_per_s"),
        get("peak_cpu_per_s")
    );
    println!(
        "IOPS:                   {} avg / {} peak",
        get("avg_iops"),
        get("peak_iops")
    );
    println!(
        "Memory in use (GB):     {} avg / {} peak",
        get("avg_memory"),
        get("peak_memory")
    );
    println!(
        "Cache (GB):             {} now, {} recommended",
        get("current_sga"),
        get("recommended_sga")
    );
    println!();
}

fn print_storage_section(values: &BTreeMap<String, String>) {
    let get = |key: &str| values.get(key).cloned().unwrap_or_else(|| "N/A".to_string());

    println!("{}", "Storage Projection (monthly)".bold());
    println!("{}", "-".repeat(60));
    println!(
        "Growth:                 {} GB/year ({} %)",
        get("yearly_growth"),
        get("yearly_growth_rate")
    );
    for year in 0..=3 {
        println!(
            "Year {}:                 {} ({} GB)",
            year,
            format_currency(&get(&format!("stor_total_{year}y"))),
            if year == 0 {
                get("db_size")
            } else {
                get(&format!("db_size_{year}y"))
            }
        );
    }
    println!(
        "Provisioned IOPS:       {}",
        format_currency(&get("iops_cost"))
    );
    println!(
        "Provisioned throughput: {}",
        format_currency(&get("throughput_cost"))
    );
    println!();
}

fn print_network_section(values: &BTreeMap<String, String>) {
    let get = |key: &str| values.get(key).cloned().unwrap_or_else(|| "N/A".to_string());

    if get("net_scenario") == "N/A" {
        print_warning("no network traffic figures in the input, network costs assumed zero");
        println!();
        return;
    }

    println!("{}", "Network (monthly)".bold());
    println!("{}", "-".repeat(60));
    println!("Scenario:               {}", get("net_scenario"));
    println!("Traffic (GB):           {}", get("net_total_monthly"));
    println!(
        "Cross-AZ cost:          {}",
        format_currency(&get("net_cost_cross_az"))
    );
    println!(
        "With replica (same region):   {}",
        format_currency(&get("net_cost_rr_cross_az"))
    );
    println!(
        "With replica (cross region):  {}",
        format_currency(&get("net_cost_rr_cross_region"))
    );
    println!();
}

fn print_family_pricing(values: &BTreeMap<String, String>, family: &str) {
    let get = |key: &str| values.get(key).cloned().unwrap_or_else(|| "N/A".to_string());

    println!(
        "{} {}",
        format!("Family {family}").bold(),
        format!(
            "(spec-sized {}, cache-sized {})",
            get(&format!("spec_{family}_instance")),
            get(&format!("sga_{family}_instance"))
        )
        .dimmed()
    );

    for prefix in ["spec", "sga"] {
        let instance = get(&format!("{prefix}_{family}_instance"));
        if instance == "N/A" {
            continue;
        }
        let rows: Vec<PricingRow> = PurchaseOption::ALL
            .into_iter()
            .map(|option| {
                let suffix = option.key_suffix();
                PricingRow {
                    option: option_label(option).to_string(),
                    monthly: format_currency(&get(&format!("{prefix}_{family}_{suffix}_monthly"))),
                    total_monthly: format_currency(&get(&format!(
                        "{prefix}_{family}_{suffix}_total_monthly"
                    ))),
                    total_yearly: format_currency(&get(&format!(
                        "{prefix}_{family}_{suffix}_total_yearly"
                    ))),
                    maz_total_monthly: format_currency(&get(&format!(
                        "{prefix}_{family}_maz_{suffix}_total_monthly"
                    ))),
                }
            })
            .collect();

        println!(
            "{}",
            format!(
                "  {} on {}",
                if prefix == "spec" {
                    "Sized by server spec"
                } else {
                    "Sized by cache advice"
                },
                instance
            )
        );
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
    }
    println!();
}

fn print_tco_section(values: &BTreeMap<String, String>, families: &[String]) {
    let get = |key: &str| values.get(key).cloned().unwrap_or_else(|| "N/A".to_string());

    println!("{}", "3-Year TCO (cache-sized)".bold());
    println!("{}", "-".repeat(60));
    for family in families {
        println!(
            "{}: on-demand {} / 1yr reserved {} / 3yr reserved {}",
            family,
            format_currency(&get(&format!("tco_sga_{family}_od"))),
            format_currency(&get(&format!("tco_sga_{family}_ri1"))),
            format_currency(&get(&format!("tco_sga_{family}_ri3"))),
        );
    }
    println!();
}

fn print_refactor_section(values: &BTreeMap<String, String>, families: &[String]) {
    let get = |key: &str| values.get(key).cloned().unwrap_or_else(|| "N/A".to_string());

    if get("refac_section_visible") != "true" {
        return;
    }

    println!("{}", "Refactoring Alternative".bold());
    println!("{}", "-".repeat(60));
    for family in families {
        let yearly = get(&format!("refac_{family}_ri3au_total_yearly"));
        if yearly == "N/A" {
            continue;
        }
        println!(
            "{}: {} /year, saves {} ({} %) over replatforming",
            family,
            format_currency(&yearly),
            format_currency(&get(&format!("refac_{family}_ri3au_savings")))
                .green()
                .bold(),
            get(&format!("refac_{family}_ri3au_savings_rate")),
        );
    }
    print_info("refactoring figures assume the open-source target engine, 3yr all-upfront");
    println!();
}

fn option_label(option: PurchaseOption) -> &'static str {
    match option {
        PurchaseOption::OnDemand => "On-demand",
        PurchaseOption::Ri1yrNoUpfront => "1yr reserved, no upfront",
        PurchaseOption::Ri1yrAllUpfront => "1yr reserved, all upfront",
        PurchaseOption::Ri3yrNoUpfront => "3yr reserved, no upfront",
        PurchaseOption::Ri3yrAllUpfront => "3yr reserved, all upfront",
    }
}
