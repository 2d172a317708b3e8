//! Free-text report parsing
//!
//! Two markdown sources supplement the instrumentation dump: the migration
//! recommendation report (target engine plus two instance suggestions) and
//! the workload assessment reports (authoritative CPU-seconds figures).

use once_cell::sync::Lazy;
use regex::Regex;

/// Keyword to engine-code mapping, checked in order against the lowercased
/// recommendation text. More specific keywords come first so that an
/// edition-qualified match ("oracle se2") wins over the bare vendor name.
const TARGET_ENGINE_KEYWORDS: &[(&str, &str)] = &[
    ("aurora postgresql", "aurora-postgresql"),
    ("aurora postgres", "aurora-postgresql"),
    ("aurora mysql", "aurora-mysql"),
    ("rds for postgresql", "postgresql"),
    ("rds postgresql", "postgresql"),
    ("rds for mysql", "mysql"),
    ("rds mysql", "mysql"),
    ("rds for sql server", "sqlserver-ee"),
    ("rds sql server", "sqlserver-ee"),
    ("rds for oracle se2", "oracle-se2"),
    ("oracle se2", "oracle-se2"),
    ("rds for oracle ee", "oracle-ee"),
    ("oracle ee", "oracle-ee"),
    ("rds for oracle", "oracle-ee"),
];

static TARGET_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Recommended\s*Target\*\*\s*:\s*(.+)").unwrap());

static INSTANCE_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\|\s*\*\*Instance\s*Type\*\*\s*\|\s*(db\.\S+)\s*\|\s*(db\.\S+)\s*\|").unwrap()
});

static AVG_CPU_PER_S: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\|\s*Average\s*CPU/s\s*\|\s*([\d.]+)\s*\|").unwrap());

static PEAK_CPU_PER_S: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\|\s*Peak\s*CPU/s\s*\|\s*([\d.]+)\s*\|").unwrap());

/// Fields recovered from the migration recommendation report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationFields {
    pub target_engine: Option<String>,
    pub instance_by_size: Option<String>,
    pub instance_by_cache: Option<String>,
}

/// CPU-seconds figures recovered from a workload assessment report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuPerSecondFields {
    pub avg_cpu_per_s: Option<f64>,
    pub peak_cpu_per_s: Option<f64>,
}

impl CpuPerSecondFields {
    pub fn is_empty(&self) -> bool {
        self.avg_cpu_per_s.is_none() && self.peak_cpu_per_s.is_none()
    }
}

/// Parse the migration recommendation markdown.
///
/// The target engine comes from the bolded "Recommended Target" line; the
/// instance suggestions come from the comparison table's instance-type row
/// (first column sized from the current server, second from the cache
/// sizing advice).
pub fn parse_recommendation(content: &str) -> RecommendationFields {
    let mut fields = RecommendationFields::default();

    if let Some(caps) = TARGET_LINE.captures(content) {
        let text = caps[1].trim().to_ascii_lowercase();
        fields.target_engine = TARGET_ENGINE_KEYWORDS
            .iter()
            .find(|(keyword, _)| text.contains(keyword))
            .map(|(_, code)| code.to_string());
    }

    if let Some(caps) = INSTANCE_ROW.captures(content) {
        fields.instance_by_size = Some(caps[1].trim().to_string());
        fields.instance_by_cache = Some(caps[2].trim().to_string());
    }

    fields
}

/// Parse the CPU-seconds rows of a workload assessment report.
pub fn parse_cpu_per_s(content: &str) -> CpuPerSecondFields {
    let grab = |re: &Regex| {
        re.captures(content)
            .and_then(|caps| caps[1].parse::<f64>().ok())
    };
    CpuPerSecondFields {
        avg_cpu_per_s: grab(&AVG_CPU_PER_S),
        peak_cpu_per_s: grab(&PEAK_CPU_PER_S),
    }
}
