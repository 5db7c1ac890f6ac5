//! Counter source: raw reads of OS pseudo-files and external commands, plus
//! the parsers that turn them into numbers.
//!
//! Every read here may fail; failures default to zero/empty values and never
//! propagate. The trait seam exists so the assembler and samplers can be
//! exercised against stubbed sources in tests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Sector size used by `/sys/block/*/stat` counters.
const BLOCK_SIZE: u64 = 512;

/// Raw access to cumulative counters and textual system facts.
pub trait CounterSource: Send + Sync {
    fn read_file(&self, path: &Path) -> io::Result<String>;
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
    fn run_command(&self, name: &str, args: &[&str]) -> io::Result<String>;
}

/// Real filesystem + subprocess source.
#[derive(Debug, Default, Clone)]
pub struct FsSource;

impl CounterSource for FsSource {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries: Vec<PathBuf> = fs::read_dir(path)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .collect();
        entries.sort();
        Ok(entries)
    }

    fn run_command(&self, name: &str, args: &[&str]) -> io::Result<String> {
        let out = Command::new(name).args(args).output()?;
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

// ---------- CPU ----------

/// Total and idle jiffies from `/proc/stat` contents.
///
/// Uses the first per-core line (`cpu0`), skipping the aggregate `cpu` line,
/// and sums the nine time columns. The rolling windows only need a counter
/// that moves proportionally to CPU time, so one core's clock is enough.
pub fn parse_cpu_times(stat: &str) -> (u64, u64) {
    for line in stat.lines() {
        if !line.starts_with("cpu") {
            break;
        }
        let mut fields = line.split_whitespace();
        let label = fields.next().unwrap_or("");
        if label == "cpu" {
            continue;
        }
        let cols: Vec<u64> = fields.take(9).map(|f| f.parse().unwrap_or(0)).collect();
        let total = cols.iter().sum();
        let idle = cols.get(3).copied().unwrap_or(0);
        return (total, idle);
    }
    (0, 0)
}

pub fn read_cpu_times(source: &dyn CounterSource) -> (u64, u64) {
    source
        .read_file(Path::new("/proc/stat"))
        .map(|s| parse_cpu_times(&s))
        .unwrap_or((0, 0))
}

// ---------- Disk ----------

/// Read/write bytes from one `/sys/block/<dev>/stat` file. Devices with no
/// traffic at all (zero sectors both ways) are skipped, matching how inert
/// loop/ram devices show up.
pub fn parse_block_stat(stat: &str) -> Option<(u64, u64)> {
    let fields: Vec<&str> = stat.split_whitespace().collect();
    if fields.len() < 7 {
        return None;
    }
    let read_sectors: u64 = fields[2].parse().unwrap_or(0);
    let write_sectors: u64 = fields[6].parse().unwrap_or(0);
    if read_sectors == 0 && write_sectors == 0 {
        return None;
    }
    Some((read_sectors * BLOCK_SIZE, write_sectors * BLOCK_SIZE))
}

/// Cumulative read/write bytes summed across all block devices.
pub fn read_disk_totals(source: &dyn CounterSource) -> (u64, u64) {
    let mut read = 0u64;
    let mut write = 0u64;
    let devices = match source.list_dir(Path::new("/sys/block")) {
        Ok(d) => d,
        Err(_) => return (0, 0),
    };
    for dev in devices {
        let Ok(stat) = source.read_file(&dev.join("stat")) else {
            continue;
        };
        if let Some((r, w)) = parse_block_stat(&stat) {
            read = read.saturating_add(r);
            write = write.saturating_add(w);
        }
    }
    (read, write)
}

// ---------- Network ----------

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NetTotals {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
}

/// Cumulative byte/packet totals over all non-loopback interfaces in
/// `/proc/net/dev` contents (two header lines, then one line per interface).
pub fn parse_net_dev(dev: &str) -> NetTotals {
    let mut totals = NetTotals::default();
    for line in dev.lines().skip(2) {
        let line = line.trim();
        if line.starts_with("lo:") {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 12 {
            continue;
        }
        totals.rx_bytes += fields[1].parse().unwrap_or(0);
        totals.rx_packets += fields[2].parse().unwrap_or(0);
        totals.tx_bytes += fields[9].parse().unwrap_or(0);
        totals.tx_packets += fields[10].parse().unwrap_or(0);
    }
    totals
}

pub fn read_net_totals(source: &dyn CounterSource) -> NetTotals {
    source
        .read_file(Path::new("/proc/net/dev"))
        .map(|s| parse_net_dev(&s))
        .unwrap_or_default()
}

// ---------- Memory ----------

/// (available, total) bytes from the first lines of `/proc/meminfo`.
pub fn parse_mem_info(meminfo: &str) -> (u64, u64) {
    let mut available = 0u64;
    let mut total = 0u64;
    for line in meminfo.lines().take(6) {
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("memtotal") {
            total = first_integer(line).unwrap_or(0) * 1024;
        } else if lower.starts_with("memavailable") {
            available = first_integer(line).unwrap_or(0) * 1024;
        }
    }
    (available, total)
}

pub fn read_mem_info(source: &dyn CounterSource) -> (u64, u64) {
    source
        .read_file(Path::new("/proc/meminfo"))
        .map(|s| parse_mem_info(&s))
        .unwrap_or((0, 0))
}

// ---------- Process RSS ----------

/// VmRSS bytes from `/proc/self/status` contents.
pub fn parse_status_rss(status: &str) -> u64 {
    for line in status.lines() {
        if line.to_ascii_lowercase().contains("vmrss") {
            return first_integer(line).unwrap_or(0) * 1024;
        }
    }
    0
}

pub fn read_self_rss(source: &dyn CounterSource) -> u64 {
    source
        .read_file(Path::new("/proc/self/status"))
        .map(|s| parse_status_rss(&s))
        .unwrap_or(0)
}

/// RSS bytes from `tasklist /FO LIST` output: the memory line ends with a
/// comma-grouped number and a `K` suffix, e.g. `Mem Usage:     12,345 K`.
pub fn parse_tasklist_rss(out: &str) -> Option<u64> {
    for line in out.lines() {
        let line = line.trim();
        let Some(rest) = line
            .strip_suffix('K')
            .or_else(|| line.strip_suffix('k'))
        else {
            continue;
        };
        let digits: String = rest
            .trim_end()
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit() || *c == ',')
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .filter(|c| c.is_ascii_digit())
            .collect();
        if digits.is_empty() {
            continue;
        }
        if let Ok(kb) = digits.parse::<u64>() {
            return Some(kb * 1024);
        }
    }
    None
}

// ---------- One-shot facts ----------

/// Uptime seconds: first field of `/proc/uptime`, truncated.
pub fn parse_uptime(uptime: &str) -> u64 {
    uptime
        .split_whitespace()
        .next()
        .and_then(|f| f.parse::<f64>().ok())
        .map(|f| f as u64)
        .unwrap_or(0)
}

pub fn read_uptime(source: &dyn CounterSource) -> u64 {
    source
        .read_file(Path::new("/proc/uptime"))
        .map(|s| parse_uptime(&s))
        .unwrap_or(0)
}

/// First three fields of `/proc/loadavg`, space-joined.
pub fn parse_load_avg(loadavg: &str) -> String {
    loadavg
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn read_load_avg(source: &dyn CounterSource) -> String {
    source
        .read_file(Path::new("/proc/loadavg"))
        .map(|s| parse_load_avg(&s))
        .unwrap_or_default()
}

/// Entry count of one `/proc/net/{tcp,udp}[6]` table: newline count minus
/// the single header line, clamped at zero. Subtracting per file (instead of
/// a flat 2 from the v4+v6 sum) keeps the count honest when only one of the
/// two tables has entries.
pub fn connection_count(source: &dyn CounterSource, path: &str) -> i64 {
    match source.read_file(Path::new(path)) {
        Ok(s) => {
            let lines = s.bytes().filter(|&b| b == b'\n').count() as i64;
            (lines - 1).max(0)
        }
        Err(_) => 0,
    }
}

/// Logged-in session count from `who` output (one line per session).
pub fn parse_login_count(who: &str) -> i64 {
    who.lines().filter(|l| !l.trim().is_empty()).count() as i64
}

pub fn read_login_count(source: &dyn CounterSource) -> i64 {
    source
        .run_command("who", &[])
        .map(|out| parse_login_count(&out))
        .unwrap_or(0)
}

/// First half of the address plus a mask suffix; empty for anything too
/// short to be an address. The echo body is attacker-ish input (error pages,
/// proxy banners), so the split point walks back to a char boundary instead
/// of assuming ASCII.
pub fn obfuscate_ip(raw: &str) -> String {
    let s = raw.trim();
    if s.len() <= 4 {
        return String::new();
    }
    let mut half = s.len() / 2;
    while !s.is_char_boundary(half) {
        half -= 1;
    }
    format!("{}****", &s[..half])
}

fn first_integer(line: &str) -> Option<u64> {
    let start = line.find(|c: char| c.is_ascii_digit())?;
    let digits: String = line[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
