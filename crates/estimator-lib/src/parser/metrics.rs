//! Per-section aggregation of the instrumentation dump
//!
//! Rows arrive per snapshot per cluster member. Percent-style metrics are
//! averaged across members, throughput-style metrics are summed across
//! members, then snapshot figures collapse to an average plus a peak.

use std::collections::HashMap;

use crate::models::{CacheSizingAdvice, PerformanceMetrics, ServerSpec};
use crate::parser::section::RawSection;
use crate::parser::units;

/// Recommended cache size is the smallest advised size whose estimated
/// workload-time factor stays at or under this value.
pub const CACHE_ADVICE_TIME_FACTOR_MAX: f64 = 0.90;

/// Advice rows within this distance of factor 1.0 describe the current size.
const CURRENT_SIZE_FACTOR_TOLERANCE: f64 = 0.01;

/// One snapshot/member observation from the main metrics table.
#[derive(Debug, Clone, Default)]
struct SnapshotRow {
    snap: String,
    cpu_percent: Option<f64>,
    cpu_percent_max: Option<f64>,
    cpu_per_s: Option<f64>,
    cpu_per_s_max: Option<f64>,
    read_iops: Option<f64>,
    write_iops: Option<f64>,
    read_iops_max: Option<f64>,
    write_iops_max: Option<f64>,
    redo_mb_s: Option<f64>,
    window_minutes: Option<f64>,
}

/// Aggregated output of the main metrics section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MainMetricsSummary {
    pub metrics: PerformanceMetrics,
    /// Mean snapshot duration, used as the window for sections that carry
    /// no duration of their own.
    pub window_minutes: Option<f64>,
}

/// Mean per-window network traffic from the sysstat section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkSummary {
    pub incoming_mb_per_window: Option<f64>,
    pub outgoing_mb_per_window: Option<f64>,
    pub window_minutes: Option<f64>,
}

impl NetworkSummary {
    /// Daily byte figures, falling back through the supplied window and
    /// then the default sampling window.
    pub fn to_bytes_per_day(&self, fallback_window: Option<f64>) -> (Option<f64>, Option<f64>) {
        let window = self
            .window_minutes
            .or(fallback_window)
            .unwrap_or(units::DEFAULT_WINDOW_MINUTES);
        let recv = self
            .incoming_mb_per_window
            .map(|mb| units::mb_per_window_to_bytes_per_day(mb, window));
        let sent = self
            .outgoing_mb_per_window
            .map(|mb| units::mb_per_window_to_bytes_per_day(mb, window));
        (sent, recv)
    }
}

/// Parse the key/value server-information section.
///
/// Returns the static server attributes plus the currently configured
/// cache size (which seeds the sizing advice when the advice table is
/// missing).
pub fn parse_os_information(section: &RawSection) -> (ServerSpec, CacheSizingAdvice) {
    let kv = section.key_values();
    let mut server = ServerSpec::default();
    let mut advice = CacheSizingAdvice::default();

    server.db_name = kv.get("db_name").cloned();

    server.engine_version = kv.get("version").cloned().or_else(|| {
        kv.get("banner")
            .and_then(|banner| extract_release_version(banner))
    });

    server.cpu_cores = kv.get("num_cpu_cores").and_then(|v| v.parse().ok());
    server.logical_cpus = kv.get("num_cpus").and_then(|v| v.parse().ok());
    server.physical_memory_gb = kv.get("physical_memory_gb").and_then(|v| v.parse().ok());
    server.db_size_gb = kv.get("total_db_size_gb").and_then(|v| v.parse().ok());

    server.cluster_config = kv.get("instances").map(|raw| match raw.parse::<u32>() {
        Ok(n) if n > 1 => format!("{n} (clustered)"),
        Ok(_) => "1 (single)".to_string(),
        Err(_) => raw.clone(),
    });

    if let Some(bytes) = kv.get("sga_target").and_then(|v| v.parse::<f64>().ok()) {
        if bytes > 0.0 {
            advice.current_gb = Some(round_to(units::bytes_to_gb(bytes), 1));
        }
    }

    (server, advice)
}

fn extract_release_version(banner: &str) -> Option<String> {
    let rest = banner.split("Release").nth(1)?;
    let version: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if version.is_empty() {
        None
    } else {
        Some(version)
    }
}

/// Aggregate the main metrics table.
///
/// Per snapshot: CPU% averages across members, everything throughput-like
/// (CPU seconds per second, IOPS, redo) sums across members. Across
/// snapshots: averages use the mean, peaks use the max.
pub fn aggregate_main_metrics(section: &RawSection) -> MainMetricsSummary {
    let rows: Vec<SnapshotRow> = section
        .rows
        .iter()
        .map(|row| SnapshotRow {
            snap: section.value(row, "snap").unwrap_or("0").to_string(),
            cpu_percent: section.numeric(row, "os_cpu"),
            cpu_percent_max: section.numeric(row, "os_cpu_max"),
            cpu_per_s: section.numeric(row, "cpu_per_s"),
            cpu_per_s_max: section.numeric(row, "cpu_per_s_max"),
            read_iops: section.numeric(row, "read_iops"),
            write_iops: section.numeric(row, "write_iops"),
            read_iops_max: section.numeric(row, "read_iops_max"),
            write_iops_max: section.numeric(row, "write_iops_max"),
            redo_mb_s: section.numeric(row, "redo_mb_s"),
            window_minutes: section.numeric(row, "dur_m"),
        })
        .collect();

    let mut groups: Vec<(String, Vec<SnapshotRow>)> = Vec::new();
    for row in rows {
        match groups.iter_mut().find(|(k, _)| *k == row.snap) {
            Some((_, members)) => members.push(row),
            None => groups.push((row.snap.clone(), vec![row])),
        }
    }

    let mut snap_cpu = Vec::new();
    let mut snap_cpu_max = Vec::new();
    let mut snap_cpu_per_s = Vec::new();
    let mut snap_cpu_per_s_max = Vec::new();
    let mut snap_iops = Vec::new();
    let mut snap_iops_max = Vec::new();
    let mut snap_redo = Vec::new();
    let mut snap_window = Vec::new();

    for (_, members) in &groups {
        if let Some(avg) = mean(members.iter().filter_map(|r| r.cpu_percent)) {
            snap_cpu.push(avg);
        }
        if let Some(max) = max_of(members.iter().filter_map(|r| r.cpu_percent_max)) {
            snap_cpu_max.push(max);
        }
        if let Some(sum) = sum_of(members.iter().filter_map(|r| r.cpu_per_s)) {
            snap_cpu_per_s.push(sum);
        }
        if let Some(sum) = sum_of(members.iter().filter_map(|r| r.cpu_per_s_max)) {
            snap_cpu_per_s_max.push(sum);
        }

        // Missing read or write halves count as zero for the member total
        let iops: f64 = members
            .iter()
            .map(|r| r.read_iops.unwrap_or(0.0) + r.write_iops.unwrap_or(0.0))
            .sum();
        if members
            .iter()
            .any(|r| r.read_iops.is_some() || r.write_iops.is_some())
        {
            snap_iops.push(iops);
        }

        let iops_max: f64 = members
            .iter()
            .map(|r| r.read_iops_max.unwrap_or(0.0) + r.write_iops_max.unwrap_or(0.0))
            .sum();
        if members
            .iter()
            .any(|r| r.read_iops_max.is_some() || r.write_iops_max.is_some())
        {
            snap_iops_max.push(iops_max);
        }

        if let Some(sum) = sum_of(members.iter().filter_map(|r| r.redo_mb_s)) {
            snap_redo.push(sum);
        }
        if let Some(window) = members.iter().find_map(|r| r.window_minutes) {
            snap_window.push(window);
        }
    }

    let mut metrics = PerformanceMetrics::default();
    metrics.avg_cpu_percent = mean(snap_cpu.iter().copied()).map(|v| round_to(v, 1));
    metrics.peak_cpu_percent = max_of(snap_cpu_max.iter().copied()).map(|v| round_to(v, 1));
    metrics.avg_cpu_per_s = mean(snap_cpu_per_s.iter().copied()).map(|v| round_to(v, 3));
    metrics.peak_cpu_per_s = max_of(snap_cpu_per_s_max.iter().copied()).map(|v| round_to(v, 3));
    metrics.avg_iops = mean(snap_iops.iter().copied()).map(|v| round_to(v, 0));
    metrics.peak_iops = max_of(snap_iops_max.iter().copied()).map(|v| round_to(v, 0));
    metrics.redo_bytes_per_day =
        mean(snap_redo.iter().copied()).map(units::mb_per_sec_to_bytes_per_day);

    MainMetricsSummary {
        metrics,
        window_minutes: mean(snap_window.iter().copied()),
    }
}

/// Aggregate the memory table: combined SGA+PGA totals sum across members
/// per snapshot, then average and peak across snapshots.
pub fn aggregate_memory(section: &RawSection) -> PerformanceMetrics {
    let mut snap_totals: HashMap<String, f64> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for row in &section.rows {
        let Some(total) = section.numeric(row, "total") else {
            continue;
        };
        let snap = section.value(row, "snap_id").unwrap_or("0").to_string();
        if !snap_totals.contains_key(&snap) {
            order.push(snap.clone());
        }
        *snap_totals.entry(snap).or_insert(0.0) += total;
    }

    let totals: Vec<f64> = order.iter().filter_map(|k| snap_totals.get(k)).copied().collect();

    PerformanceMetrics {
        avg_memory_gb: mean(totals.iter().copied()).map(|v| round_to(v, 1)),
        peak_memory_gb: max_of(totals.iter().copied()).map(|v| round_to(v, 1)),
        ..Default::default()
    }
}

/// Extract cache sizing advice.
///
/// Only rows for cluster member 1 are considered (the advice table repeats
/// per member with near-identical figures). Current size is the row whose
/// size factor is 1.0; recommended size is the smallest size whose
/// estimated time factor clears the threshold.
pub fn extract_cache_advice(section: &RawSection) -> CacheSizingAdvice {
    let mut current: Option<f64> = None;
    let mut recommended: Option<f64> = None;

    for row in &section.rows {
        let member = section
            .numeric(row, "inst_id")
            .map(|v| v as i64)
            .unwrap_or(1);
        if member != 1 {
            continue;
        }

        let (Some(size), Some(factor)) = (
            section.numeric(row, "sga_size"),
            section.numeric(row, "sga_size_factor"),
        ) else {
            continue;
        };

        if (factor - 1.0).abs() < CURRENT_SIZE_FACTOR_TOLERANCE {
            current = Some(size);
        }

        if let Some(time_factor) = section.numeric(row, "estd_db_time_factor") {
            if time_factor <= CACHE_ADVICE_TIME_FACTOR_MAX
                && recommended.map_or(true, |best| size < best)
            {
                recommended = Some(size);
            }
        }
    }

    CacheSizingAdvice {
        current_gb: current,
        recommended_gb: recommended,
    }
}

/// Aggregate the sysstat network table: mean per-window megabytes across
/// all rows, plus the section's own window duration when present.
pub fn aggregate_sysstat(section: &RawSection) -> NetworkSummary {
    let mut incoming = Vec::new();
    let mut outgoing = Vec::new();
    let mut windows = Vec::new();

    for row in &section.rows {
        if let Some(v) = section.numeric(row, "network_incoming_mb") {
            incoming.push(v);
        }
        if let Some(v) = section.numeric(row, "network_outgoing_mb") {
            outgoing.push(v);
        }
        if let Some(v) = section.numeric(row, "dur_m") {
            windows.push(v);
        }
    }

    NetworkSummary {
        incoming_mb_per_window: mean(incoming.into_iter()),
        outgoing_mb_per_window: mean(outgoing.into_iter()),
        window_minutes: mean(windows.into_iter()),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn max_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc, v| {
        Some(match acc {
            Some(best) if best >= v => best,
            _ => v,
        })
    })
}

fn sum_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut any = false;
    let total = values.inspect(|_| any = true).sum();
    if any {
        Some(total)
    } else {
        None
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
