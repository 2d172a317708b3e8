//! Instrumentation report parsing
//!
//! Turns an input path (one dump file, or a directory holding dump files
//! plus optional markdown reports) into one [`ParsedReport`]. Every failure
//! below the level of "nothing readable at all" is recovered in place: a
//! bad file or section is logged and skipped, and an empty report is valid
//! output.

pub mod metrics;
pub mod recommendation;
pub mod section;
pub mod units;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::models::{CacheSizingAdvice, ParsedReport, PerformanceMetrics, StorageGrowth};
use section::{RawSection, SectionKind};

const DUMP_EXTENSION: &str = "out";
const RECOMMENDATION_FILENAME: &str = "migration_recommendation.md";
const ASSESSMENT_PREFIX: &str = "dbcsi";

/// Parser for one input path (dump file or report directory).
#[derive(Debug, Default)]
pub struct ReportParser;

impl ReportParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse every report found under `input` into one merged record.
    ///
    /// Dump files merge left-to-right in sorted filename order with
    /// first-wins semantics per field. The recommendation file fills any
    /// remaining gaps; the workload assessment reports override the dump's
    /// CPU-seconds figures when present.
    pub fn parse(&self, input: &Path) -> ParsedReport {
        info!(path = %input.display(), "parsing instrumentation reports");

        let mut report = ParsedReport::default();
        for dump_file in find_dump_files(input) {
            let content = match fs::read_to_string(&dump_file) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %dump_file.display(), error = %e, "skipping unreadable dump file");
                    continue;
                }
            };
            debug!(path = %dump_file.display(), "parsing dump file");
            report = ParsedReport::merge(report, parse_dump(&content));
        }

        if let Some(rec_file) = find_recommendation_file(input) {
            match fs::read_to_string(&rec_file) {
                Ok(content) => {
                    let fields = recommendation::parse_recommendation(&content);
                    report.target_engine = report.target_engine.or(fields.target_engine);
                    report.instance_by_size = report.instance_by_size.or(fields.instance_by_size);
                    report.instance_by_cache =
                        report.instance_by_cache.or(fields.instance_by_cache);
                }
                Err(e) => {
                    warn!(path = %rec_file.display(), error = %e, "skipping unreadable recommendation file");
                }
            }
        }

        // Assessment reports carry the authoritative CPU-seconds figures;
        // the first file that yields any wins.
        for assessment in find_assessment_files(input) {
            let content = match fs::read_to_string(&assessment) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %assessment.display(), error = %e, "skipping unreadable assessment report");
                    continue;
                }
            };
            let cpu = recommendation::parse_cpu_per_s(&content);
            if !cpu.is_empty() {
                debug!(path = %assessment.display(), "CPU-seconds figures taken from assessment report");
                report.metrics.avg_cpu_per_s = cpu.avg_cpu_per_s.or(report.metrics.avg_cpu_per_s);
                report.metrics.peak_cpu_per_s =
                    cpu.peak_cpu_per_s.or(report.metrics.peak_cpu_per_s);
                break;
            }
        }

        let report = report.normalized();
        info!(
            db_name = report.server.db_name.as_deref().unwrap_or("unknown"),
            "report parsing complete"
        );
        report
    }
}

/// Parse all known sections of one dump file's content.
fn parse_dump(content: &str) -> ParsedReport {
    let mut report = ParsedReport::default();

    if let Some(section) = RawSection::extract(content, SectionKind::OsInformation) {
        let (server, advice) = metrics::parse_os_information(&section);
        report.server = server;
        report.cache_advice = advice;
    }

    let mut main_window = None;
    if let Some(section) = RawSection::extract(content, SectionKind::MainMetrics) {
        let summary = metrics::aggregate_main_metrics(&section);
        main_window = summary.window_minutes;
        report.metrics = summary.metrics;
    }

    if let Some(section) = RawSection::extract(content, SectionKind::Memory) {
        report.metrics =
            PerformanceMetrics::merge(report.metrics, metrics::aggregate_memory(&section));
    }

    if let Some(section) = RawSection::extract(content, SectionKind::SgaAdvice) {
        // The configured target size from the server section wins over the
        // advice table's factor-1.0 row when both are present.
        report.cache_advice =
            CacheSizingAdvice::merge(report.cache_advice, metrics::extract_cache_advice(&section));
    }

    if let Some(section) = RawSection::extract(content, SectionKind::Sysstat) {
        let net = metrics::aggregate_sysstat(&section);
        let (sent, recv) = net.to_bytes_per_day(main_window);
        report.metrics.sent_bytes_per_day = sent;
        report.metrics.recv_bytes_per_day = recv;
    }

    report.growth = StorageGrowth {
        current_size_gb: report.server.db_size_gb,
        ..Default::default()
    };

    report
}

/// Dump files under the input path, in sorted filename order.
fn find_dump_files(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return if input.extension().is_some_and(|ext| ext == DUMP_EXTENSION) {
            vec![input.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let Ok(entries) = fs::read_dir(input) else {
        warn!(path = %input.display(), "input path is not a readable file or directory");
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == DUMP_EXTENSION)
        })
        .collect();
    files.sort();
    files
}

/// The recommendation file next to the input, when present.
fn find_recommendation_file(input: &Path) -> Option<PathBuf> {
    let dir = if input.is_dir() {
        input
    } else {
        input.parent()?
    };
    let candidate = dir.join(RECOMMENDATION_FILENAME);
    candidate.is_file().then_some(candidate)
}

/// Workload assessment reports (`dbcsi*.md`) next to the input, sorted.
fn find_assessment_files(input: &Path) -> Vec<PathBuf> {
    let dir = if input.is_dir() {
        input
    } else {
        match input.parent() {
            Some(parent) => parent,
            None => return Vec::new(),
        }
    };

    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                return false;
            };
            let lower = name.to_ascii_lowercase();
            path.is_file() && lower.starts_with(ASSESSMENT_PREFIX) && lower.ends_with(".md")
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DUMP: &str = "\
~~BEGIN-OS-INFORMATION~~
STAT_NAME            STAT_VALUE
-------------------- ----------
DB_NAME              PRODDB
VERSION              19.0.0.0.0
NUM_CPU_CORES        8
NUM_CPUS             16
PHYSICAL_MEMORY_GB   128
TOTAL_DB_SIZE_GB     500
INSTANCES            1
~~END-OS-INFORMATION~~
~~BEGIN-MAIN-METRICS~~
snap dur_m end             inst os_cpu os_cpu_max cpu_per_s read_iops write_iops redo_mb_s
---- ----- --------------- ---- ------ ---------- --------- --------- ---------- ---------
1    60    26/01/15 09:00  1    40.0   70.0       10.0      700       300        0.5
2    60    26/01/15 10:00  1    60.0   80.0       20.0      900       600        1.5
~~END-MAIN-METRICS~~
~~BEGIN-SYSSTAT~~
SNAP_ID network_incoming_mb network_outgoing_mb
------- ------------------- -------------------
1       100.0               1024.0
2       300.0               1024.0
~~END-SYSSTAT~~
";

    fn write_file(dir: &Path, name: &str, content: &str) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_parse_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "awr_node1.out", DUMP);

        let parser = ReportParser::new();
        let first = parser.parse(dir.path());
        let second = parser.parse(dir.path());
        assert_eq!(first, second);
        assert_eq!(first.server.db_name.as_deref(), Some("PRODDB"));
        assert_eq!(first.metrics.avg_cpu_percent, Some(50.0));
    }

    #[test]
    fn test_first_file_wins_across_dumps() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a_first.out", DUMP);
        write_file(
            dir.path(),
            "b_second.out",
            "\
~~BEGIN-OS-INFORMATION~~
DB_NAME              OTHERDB
SGA_TARGET           42949672960
~~END-OS-INFORMATION~~
",
        );

        let report = ReportParser::new().parse(dir.path());
        // first file already supplied db_name; second only fills the gap
        assert_eq!(report.server.db_name.as_deref(), Some("PRODDB"));
        assert_eq!(report.cache_advice.current_gb, Some(40.0));
    }

    #[test]
    fn test_network_converts_with_main_metrics_window() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "awr.out", DUMP);

        let report = ReportParser::new().parse(dir.path());
        assert_eq!(
            report.metrics.sent_bytes_per_day,
            Some(1024.0 * 24.0 * 1024.0 * 1024.0)
        );
        assert_eq!(
            report.metrics.recv_bytes_per_day,
            Some(200.0 * 24.0 * 1024.0 * 1024.0)
        );
    }

    #[test]
    fn test_markdown_reports_supplement_the_dump() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "awr.out", DUMP);
        write_file(
            dir.path(),
            "migration_recommendation.md",
            "**Recommended Target**: Aurora PostgreSQL\n\
             | **Instance Type** | db.r6i.8xlarge | db.r6i.4xlarge |\n",
        );
        write_file(
            dir.path(),
            "dbcsi_report.md",
            "| Average CPU/s | 47.12 |\n| Peak CPU/s | 52.50 |\n",
        );

        let report = ReportParser::new().parse(dir.path());
        assert_eq!(report.target_engine.as_deref(), Some("aurora-postgresql"));
        assert_eq!(report.instance_by_size.as_deref(), Some("db.r6i.8xlarge"));
        assert_eq!(report.instance_by_cache.as_deref(), Some("db.r6i.4xlarge"));
        // assessment report overrides the dump's cpu_per_s figures
        assert_eq!(report.metrics.avg_cpu_per_s, Some(47.12));
        assert_eq!(report.metrics.peak_cpu_per_s, Some(52.5));
    }

    #[test]
    fn test_unreadable_input_yields_empty_report() {
        let report = ReportParser::new().parse(Path::new("/nonexistent/input"));
        assert_eq!(report, ParsedReport::default());
    }

    #[test]
    fn test_db_size_seeds_growth() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "awr.out", DUMP);

        let report = ReportParser::new().parse(dir.path());
        assert_eq!(report.growth.current_size_gb, Some(500.0));
    }
}
