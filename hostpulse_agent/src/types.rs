//! Snapshot sent to the collector. Keep this module minimal and stable — it
//! defines the wire format, and the field names are what the collector
//! already ingests.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Snapshot {
    #[serde(rename = "Name")]
    pub name: String,
    /// Obfuscated public IP; empty until the first successful lookup.
    #[serde(rename = "IP")]
    pub ip: String,
    #[serde(rename = "RSS")]
    pub rss: u64,
    /// Load average, up to three space-separated numbers.
    #[serde(rename = "Load")]
    pub load: String,
    #[serde(rename = "Uptime")]
    pub uptime: u64,
    #[serde(rename = "MemAvail")]
    pub mem_avail: u64,
    #[serde(rename = "MemTotal")]
    pub mem_total: u64,
    #[serde(rename = "Login")]
    pub login: i64,
    #[serde(rename = "TCP")]
    pub tcp: i64,
    #[serde(rename = "UDP")]
    pub udp: i64,
    // Rolling windows, oldest first, bytes/sec or packets/sec.
    #[serde(rename = "DiskRead")]
    pub disk_read: Vec<u64>,
    #[serde(rename = "DiskWrite")]
    pub disk_write: Vec<u64>,
    #[serde(rename = "NetRead")]
    pub net_read: Vec<u64>,
    #[serde(rename = "NetWrite")]
    pub net_write: Vec<u64>,
    #[serde(rename = "NetReadNum")]
    pub net_read_num: Vec<u64>,
    #[serde(rename = "NetWriteNum")]
    pub net_write_num: Vec<u64>,
    /// Per-interval CPU utilization percentages, two-decimal rounding.
    #[serde(rename = "CPUS")]
    pub cpus: Vec<f64>,
    #[serde(rename = "PostUnixTime")]
    pub post_unix_time: i64,
    /// Wall time spent assembling this snapshot, nanoseconds.
    #[serde(rename = "Time")]
    pub time_ns: u64,
}
