//! Parse-only command for inspecting what the input files yield

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use estimator_lib::{ParsedReport, ReportParser};

use crate::output::{format_field, print_warning, OutputFormat};

pub fn run(input: &Path, format: OutputFormat) -> Result<()> {
    let report = ReportParser::new().parse(input);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &ParsedReport) {
    let text = |value: &Option<String>| {
        value
            .clone()
            .unwrap_or_else(|| "N/A".dimmed().to_string())
    };

    println!("{}", "Parsed Report".bold());
    println!("{}", "=".repeat(50));

    let server = &report.server;
    println!("Database:               {}", text(&server.db_name).cyan());
    println!("Engine version:         {}", text(&server.engine_version));
    println!(
        "CPU:                    {} cores, {} logical",
        server
            .cpu_cores
            .map(|v| v.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        server
            .logical_cpus
            .map(|v| v.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
    );
    println!(
        "Physical memory (GB):   {}",
        format_field(&server.physical_memory_gb)
    );
    println!(
        "Database size (GB):     {}",
        format_field(&server.db_size_gb)
    );
    println!("Configuration:          {}", text(&server.cluster_config));
    println!();

    let m = &report.metrics;
    println!("{}", "Workload".bold());
    println!("{}", "-".repeat(50));
    println!(
        "CPU %:                  {} avg / {} peak",
        format_field(&m.avg_cpu_percent),
        format_field(&m.peak_cpu_percent)
    );
    println!(
        "CPU seconds/s:          {} avg / {} peak",
        format_field(&m.avg_cpu_per_s),
        format_field(&m.peak_cpu_per_s)
    );
    println!(
        "IOPS:                   {} avg / {} peak",
        format_field(&m.avg_iops),
        format_field(&m.peak_iops)
    );
    println!(
        "Memory (GB):            {} avg / {} peak",
        format_field(&m.avg_memory_gb),
        format_field(&m.peak_memory_gb)
    );
    println!(
        "Traffic (bytes/day):    {} sent / {} received / {} redo",
        format_field(&m.sent_bytes_per_day),
        format_field(&m.recv_bytes_per_day),
        format_field(&m.redo_bytes_per_day)
    );
    println!();

    println!("{}", "Sizing Inputs".bold());
    println!("{}", "-".repeat(50));
    println!(
        "Cache (GB):             {} now, {} recommended",
        format_field(&report.cache_advice.current_gb),
        format_field(&report.cache_advice.recommended_gb)
    );
    println!("Target engine:          {}", text(&report.target_engine));
    println!(
        "Recommended instances:  {} (by spec), {} (by cache)",
        text(&report.instance_by_size),
        text(&report.instance_by_cache)
    );

    if report.server.db_name.is_none() && report.metrics.avg_cpu_percent.is_none() {
        println!();
        print_warning("nothing recognizable found in the input, check the path");
    }
}
