use std::borrow::Cow;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::metrics::{AccessTimes, MetricsSnapshot};
use crate::trace::{AccessRecord, Operation};

/// Load a trace file: one `<pid> <R|W> <virtual address>` record per line
pub fn read_trace<P: AsRef<Path>>(path: P, page_size: u64) -> Result<Vec<AccessRecord>> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_trace(&content, page_size)
}

/// Blank lines and `#` comments are skipped. Addresses may be decimal or `0x` hex and are
/// mapped to the page that holds them.
pub fn parse_trace(content: &str, page_size: u64) -> Result<Vec<AccessRecord>> {
    if page_size == 0 {
        return Err(SimError::ZeroPageSize);
    }

    let mut records = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let record = parse_record(line, page_size)
            .map_err(|reason| SimError::TraceParse { line: idx + 1, reason })?;
        records.push(record);
    }

    Ok(records)
}

fn parse_record(line: &str, page_size: u64) -> std::result::Result<AccessRecord, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 3 {
        return Err(format!("expected 3 fields, found {}", tokens.len()));
    }

    let pid: u32 = tokens[0].parse().map_err(|_| format!("invalid PID: {}", tokens[0]))?;
    let op = match tokens[1] {
        "R" | "r" => Operation::Read,
        "W" | "w" => Operation::Write,
        other => return Err(format!("invalid operation: {} (expected R or W)", other)),
    };
    let addr = parse_address(tokens[2]).ok_or_else(|| format!("invalid address: {}", tokens[2]))?;
    let vpn = u32::try_from(addr / page_size)
        .map_err(|_| format!("address {} is beyond the virtual page range", tokens[2]))?;

    Ok(AccessRecord::new(pid, op, vpn))
}

fn parse_address(token: &str) -> Option<u64> {
    match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => token.parse().ok(),
    }
}

/// Each record is written as the address of the start of its page
pub fn format_trace(records: &[AccessRecord], page_size: u64) -> String {
    let mut out = String::with_capacity(records.len() * 12);
    for r in records {
        let addr = r.vpn as u64 * page_size;
        let _ = writeln!(out, "{} {} 0x{:x}", r.pid, r.op.as_char(), addr);
    }
    out
}

pub fn write_trace<P: AsRef<Path>>(path: P, records: &[AccessRecord], page_size: u64) -> Result<()> {
    fs::write(path.as_ref(), format_trace(records, page_size))?;
    Ok(())
}

/// One simulation run, as written to JSON and CSV reports
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub name: String,
    pub config: SimConfig,
    pub frames: usize,
    pub metrics: MetricsSnapshot,
    pub avg_access_time_ns: f64,
    pub slowdown: f64,
    pub wall_time_ms: f64,
    /// Accesses simulated per millisecond of wall time
    pub throughput: f64,
}

impl Report {
    pub fn new(
        name: &str,
        config: &SimConfig,
        metrics: MetricsSnapshot,
        times: &AccessTimes,
        wall_time: Duration,
    ) -> Self {
        let wall_time_ms = wall_time.as_nanos() as f64 / 1e6;
        let throughput = if wall_time_ms > 0.0 {
            metrics.total_accesses as f64 / wall_time_ms
        } else {
            0.0
        };

        Report {
            name: name.to_string(),
            frames: config.frame_count(),
            config: config.clone(),
            avg_access_time_ns: metrics.avg_access_time_ns(times),
            slowdown: metrics.slowdown(times),
            wall_time_ms,
            throughput,
            metrics,
        }
    }

    pub const CSV_HEADER: &'static str = "config,algorithm,ram_bytes,page_size,frames,tlb_size,\
accesses,reads,writes,page_faults,major_faults,minor_faults,fault_rate,tlb_hits,tlb_misses,\
tlb_hit_rate,swap_ins,swap_outs,replacements,avg_access_time_ns,wall_time_ms,throughput";

    pub fn csv_row(&self) -> String {
        let m = &self.metrics;
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{:.2},{:.3},{:.1}",
            csv_field(&self.name),
            self.config.algorithm,
            self.config.ram_size,
            self.config.page_size,
            self.frames,
            self.config.tlb_capacity,
            m.total_accesses,
            m.reads,
            m.writes,
            m.page_faults,
            m.major_faults,
            m.minor_faults,
            m.fault_rate_display(),
            m.tlb_hits,
            m.tlb_misses,
            m.tlb_hit_rate_display(),
            m.swap_ins,
            m.swap_outs,
            m.replacements,
            self.avg_access_time_ns,
            self.wall_time_ms,
            self.throughput
        )
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.metrics)?;
        writeln!(f)?;
        writeln!(f, "Average Memory Access Time:")?;
        writeln!(f, "  AMT:          {:12.2} ns", self.avg_access_time_ns)?;
        writeln!(f, "  Slowdown:     {:12.2}x (vs TLB hit)", self.slowdown)?;
        writeln!(f)?;
        writeln!(f, "Simulation Time:")?;
        writeln!(f, "  Wall time:    {:12.3} ms", self.wall_time_ms)?;
        write!(f, "  Throughput:   {:12.1} accesses/ms", self.throughput)
    }
}

/// Quote a CSV field when it holds a separator, quote or line break
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

pub fn write_json<P: AsRef<Path>>(path: P, report: &Report) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path.as_ref(), json)?;
    Ok(())
}

pub fn write_csv<P: AsRef<Path>>(path: P, reports: &[Report]) -> Result<()> {
    let mut out = String::from(Report::CSV_HEADER);
    out.push('\n');
    for report in reports {
        out.push_str(&report.csv_row());
        out.push('\n');
    }
    fs::write(path.as_ref(), out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Algorithm;
    use crate::metrics::Metrics;
    use crate::vm_manager::VmManager;

    const PAGE: u64 = 4096;

    #[test]
    fn test_parse_trace() {
        let content = "# pid op addr\n0 R 0x5000\n\n1 W 0x1f000\n  2 r 28672  \n";
        let records = parse_trace(content, PAGE).unwrap();
        assert_eq!(
            records,
            vec![AccessRecord::read(0, 5), AccessRecord::write(1, 31), AccessRecord::read(2, 7)]
        );
    }

    #[test]
    fn test_addresses_map_to_pages() {
        let records = parse_trace("0 R 0x1000\n0 R 0x1ff8\n0 W 0x2000\n0 R 4095\n", PAGE).unwrap();
        let vpns: Vec<u32> = records.iter().map(|r| r.vpn).collect();
        assert_eq!(vpns, vec![1, 1, 2, 0]);

        // Two addresses on one page fault once
        let mut vm = VmManager::new(SimConfig::with_frames(4, 2, Algorithm::Lru)).unwrap();
        vm.load_trace(records[..2].to_vec());
        vm.run().unwrap();
        assert_eq!(vm.metrics_snapshot().page_faults, 1);
    }

    #[test]
    fn test_page_size_changes_vpn() {
        let records = parse_trace("3 W 0x3000\n", 1024).unwrap();
        assert_eq!(records, vec![AccessRecord::write(3, 12)]);
        assert!(matches!(parse_trace("0 R 0", 0), Err(SimError::ZeroPageSize)));
    }

    #[test]
    fn test_parse_trace_empty() {
        assert!(parse_trace("", PAGE).unwrap().is_empty());
        assert!(parse_trace("# nothing\n\n", PAGE).unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = parse_trace("0 R 0x10\n# ok\n0 X 0x20\n", PAGE).unwrap_err();
        match err {
            SimError::TraceParse { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("operation"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_fields() {
        let bad = ["0 R", "x R 1", "0 R 0xzz", "0 R -1", "0 R 1 extra"];
        for line in bad {
            assert!(matches!(parse_trace(line, PAGE), Err(SimError::TraceParse { line: 1, .. })), "{line}");
        }

        // Page number does not fit the VPN type
        let huge = format!("0 R 0x{:x}", (u32::MAX as u64 + 1) * PAGE);
        assert!(matches!(parse_trace(&huge, PAGE), Err(SimError::TraceParse { .. })));
    }

    #[test]
    fn test_trace_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.txt");

        // Unaligned addresses come back as their page start
        fs::write(&path, "0 R 0x1ff8\n3 W 0x1ff123\n").unwrap();
        let records = read_trace(&path, PAGE).unwrap();
        assert_eq!(records, vec![AccessRecord::read(0, 1), AccessRecord::write(3, 511)]);

        write_trace(&path, &records, PAGE).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "0 R 0x1000\n3 W 0x1ff000\n");
        assert_eq!(read_trace(&path, PAGE).unwrap(), records);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_trace(dir.path().join("missing.txt"), PAGE).unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }

    fn sample_report(name: &str, wall_time: Duration) -> Report {
        let mut m = Metrics::new();
        m.record_access(0, false);
        m.record_access(0, true);
        m.record_tlb_miss(0);
        m.record_tlb_hit(0);
        m.record_page_fault(0, false);
        m.swap_ins = 1;
        let config = SimConfig::with_frames(16, 8, Algorithm::Lru);
        Report::new(name, &config, m.snapshot(), &AccessTimes::default(), wall_time)
    }

    #[test]
    fn test_csv_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &[sample_report("small", Duration::from_millis(2))]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], Report::CSV_HEADER);

        let header: Vec<&str> = lines[0].split(',').collect();
        let row: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(row.len(), header.len());

        let field = |name: &str| row[header.iter().position(|h| *h == name).unwrap()];
        assert_eq!(field("config"), "small");
        assert_eq!(field("algorithm"), "LRU");
        assert_eq!(field("frames"), "16");
        assert_eq!(field("fault_rate"), "50.00");
        assert_eq!(field("minor_faults"), "1");
        assert_eq!(field("wall_time_ms"), "2.000");
        assert_eq!(field("throughput"), "1.0");
    }

    #[test]
    fn test_csv_quotes_name() {
        let report = sample_report("a,b \"x\"", Duration::ZERO);
        assert!(report.csv_row().starts_with("\"a,b \"\"x\"\"\",LRU,"));
        assert!(sample_report("plain", Duration::ZERO).csv_row().starts_with("plain,LRU,"));
    }

    #[test]
    fn test_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &sample_report("small", Duration::from_millis(4))).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["name"], "small");
        assert_eq!(value["frames"], 16);
        assert_eq!(value["metrics"]["page_faults"], 1);
        assert_eq!(value["metrics"]["major_faults"], 0);
        assert_eq!(value["metrics"]["fault_rate"], 50.0);
        assert_eq!(value["wall_time_ms"], 4.0);
        assert_eq!(value["throughput"], 0.5);
    }

    #[test]
    fn test_report_display() {
        let report = sample_report("small", Duration::ZERO);
        let text = report.to_string();
        assert!(text.contains("Slowdown:"));
        assert!(text.contains("Wall time:"));
        assert!(text.contains("Throughput:            0.0 accesses/ms"));
        assert_eq!(report.throughput, 0.0);
    }
}
