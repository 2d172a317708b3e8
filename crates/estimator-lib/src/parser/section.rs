//! Section extraction from the instrumentation dump
//!
//! Each section of the dump is bounded by a `~~BEGIN-<NAME>~~` /
//! `~~END-<NAME>~~` marker pair. Extraction yields the header tokens and
//! whitespace-tokenized data rows for one section; a missing section is
//! not an error.

/// The named dump sections the parser understands.
///
/// One parse function exists per kind; dispatch goes through
/// [`SectionKind::from_marker`] instead of ad-hoc substring scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    OsInformation,
    MainMetrics,
    Memory,
    SgaAdvice,
    Sysstat,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::OsInformation,
        SectionKind::MainMetrics,
        SectionKind::Memory,
        SectionKind::SgaAdvice,
        SectionKind::Sysstat,
    ];

    /// The section name between the `~~BEGIN-` / `~~END-` delimiters.
    pub fn marker(&self) -> &'static str {
        match self {
            SectionKind::OsInformation => "OS-INFORMATION",
            SectionKind::MainMetrics => "MAIN-METRICS",
            SectionKind::Memory => "MEMORY",
            SectionKind::SgaAdvice => "SGA-ADVICE",
            SectionKind::Sysstat => "SYSSTAT",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.marker() == marker)
    }

    /// Tokens whose presence identifies the header row of this section.
    fn header_tokens(&self) -> &'static [&'static str] {
        match self {
            // Key/value section, no tabular header
            SectionKind::OsInformation => &[],
            SectionKind::MainMetrics => &["snap", "os_cpu"],
            SectionKind::Memory => &["snap_id", "total"],
            SectionKind::SgaAdvice => &["sga_size", "inst_id"],
            SectionKind::Sysstat => &["snap_id", "network_incoming_mb"],
        }
    }
}

/// Name of the header column whose data values contain an embedded space
/// (a date plus a time), shifting every later column one token right.
const WIDENING_COLUMN: &str = "end";

/// One extracted dump section: header tokens plus tokenized data rows.
///
/// Header tokens are stored lowercased; column lookups are therefore
/// case-insensitive against the dump's mixed-case headers.
#[derive(Debug, Clone)]
pub struct RawSection {
    pub kind: SectionKind,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Header index of the widening column, when present.
    widen_after: Option<usize>,
}

impl RawSection {
    /// Extract the named section from the dump text.
    ///
    /// Returns `None` when the marker pair is absent or no header row can
    /// be located in a tabular section.
    pub fn extract(content: &str, kind: SectionKind) -> Option<RawSection> {
        let begin = format!("~~BEGIN-{}~~", kind.marker());
        let end = format!("~~END-{}~~", kind.marker());

        let lines: Vec<&str> = content.lines().collect();
        let start = lines.iter().position(|l| l.trim() == begin)? + 1;
        let stop = lines[start..]
            .iter()
            .position(|l| l.trim() == end)
            .map(|i| start + i)?;
        let body = &lines[start..stop];

        if kind.header_tokens().is_empty() {
            return Some(Self::from_key_value_body(kind, body));
        }
        Self::from_tabular_body(kind, body)
    }

    /// Key/value sections: every non-empty, non-rule line is a data row.
    fn from_key_value_body(kind: SectionKind, body: &[&str]) -> RawSection {
        let rows = body
            .iter()
            .map(|l| l.trim())
            .filter(|l| {
                !l.is_empty()
                    && !l.starts_with("---")
                    && !l.to_ascii_lowercase().starts_with("stat_name")
            })
            .map(tokenize)
            .collect();
        RawSection {
            kind,
            headers: Vec::new(),
            rows,
            widen_after: None,
        }
    }

    /// Tabular sections: locate the header row heuristically, skip the
    /// dash rule below it, and tokenize everything up to the next blank
    /// line or marker.
    fn from_tabular_body(kind: SectionKind, body: &[&str]) -> Option<RawSection> {
        let wanted = kind.header_tokens();
        let header_pos = body.iter().position(|line| {
            let lower = line.to_ascii_lowercase();
            lower
                .split_whitespace()
                .any(|tok| wanted.contains(&tok))
        })?;

        let headers: Vec<String> = body[header_pos]
            .split_whitespace()
            .map(|t| t.to_ascii_lowercase())
            .collect();
        let widen_after = headers.iter().position(|h| h == WIDENING_COLUMN);

        let mut data_start = header_pos + 1;
        if let Some(rule) = body[data_start..]
            .iter()
            .position(|l| l.trim_start().starts_with("---"))
        {
            data_start = data_start + rule + 1;
        }

        let mut rows = Vec::new();
        for line in &body[data_start..] {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("~~") {
                break;
            }
            rows.push(tokenize(&trimmed));
        }

        Some(RawSection {
            kind,
            headers,
            rows,
            widen_after,
        })
    }

    /// Nominal header index for a column name (case-insensitive).
    pub fn column(&self, name: &str) -> Option<usize> {
        let lower = name.to_ascii_lowercase();
        self.headers.iter().position(|h| *h == lower)
    }

    /// Value of `name` in `row`, with the widening-column offset applied:
    /// columns after the widening column read one token further right.
    pub fn value<'a>(&self, row: &'a [String], name: &str) -> Option<&'a str> {
        let idx = self.column(name)?;
        let actual = match self.widen_after {
            Some(w) if idx > w => idx + 1,
            _ => idx,
        };
        row.get(actual).map(|s| s.as_str())
    }

    /// Like [`value`](Self::value) but parsed as a float; a non-numeric
    /// token yields `None` (the row is simply treated as not supplying
    /// that metric).
    pub fn numeric(&self, row: &[String], name: &str) -> Option<f64> {
        self.value(row, name)?.replace(',', "").parse().ok()
    }

    /// Key/value view of a non-tabular section: first token (lowercased)
    /// maps to the rest of the line.
    pub fn key_values(&self) -> std::collections::HashMap<String, String> {
        let mut kv = std::collections::HashMap::new();
        for row in &self.rows {
            if row.len() >= 2 {
                kv.entry(row[0].to_ascii_lowercase())
                    .or_insert_with(|| row[1..].join(" "));
            }
        }
        kv
    }
}

fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(|t| t.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\
~~BEGIN-MAIN-METRICS~~
snap dur_m end inst os_cpu read_iops
---- ----- --------------- ---- ------ ---------
1    60    26/01/15 09:00  1    42.5   1000
2    60    26/01/15 10:00  1    55.0   1200

~~END-MAIN-METRICS~~
~~BEGIN-OS-INFORMATION~~
STAT_NAME            STAT_VALUE
-------------------- ----------
DB_NAME              ORCL
NUM_CPUS             16
~~END-OS-INFORMATION~~
";

    #[test]
    fn test_missing_section_is_none() {
        assert!(RawSection::extract(DUMP, SectionKind::Memory).is_none());
    }

    #[test]
    fn test_marker_lookup() {
        assert_eq!(
            SectionKind::from_marker("SGA-ADVICE"),
            Some(SectionKind::SgaAdvice)
        );
        assert_eq!(SectionKind::from_marker("UNKNOWN"), None);
    }

    #[test]
    fn test_widening_column_shifts_later_lookups() {
        let section = RawSection::extract(DUMP, SectionKind::MainMetrics).unwrap();
        let row = &section.rows[0];

        // Columns before "end" are unshifted
        assert_eq!(section.value(row, "snap"), Some("1"));
        assert_eq!(section.value(row, "dur_m"), Some("60"));
        // Columns after "end" read one token right of their header index
        assert_eq!(section.value(row, "inst"), Some("1"));
        assert_eq!(section.numeric(row, "os_cpu"), Some(42.5));
        assert_eq!(section.numeric(row, "read_iops"), Some(1000.0));
    }

    #[test]
    fn test_key_value_section() {
        let section = RawSection::extract(DUMP, SectionKind::OsInformation).unwrap();
        let kv = section.key_values();
        assert_eq!(kv.get("db_name").map(String::as_str), Some("ORCL"));
        assert_eq!(kv.get("num_cpus").map(String::as_str), Some("16"));
    }

    #[test]
    fn test_rows_stop_at_blank_line() {
        let section = RawSection::extract(DUMP, SectionKind::MainMetrics).unwrap();
        assert_eq!(section.rows.len(), 2);
    }
}
