//! Host facts shown on the status screen.

use std::net::IpAddr;
use std::time::Duration;

use sysinfo::{Networks, System};

pub const UNKNOWN_HOST: &str = "unknown";
pub const NO_NETWORK: &str = "no network";

/// Synchronous host queries. Implementations absorb their own failures and
/// always hand back display-ready text.
pub trait SystemMetrics: Send {
    fn hostname(&mut self) -> String;
    fn ip_address(&mut self) -> String;
    /// CPU load as a percentage string, e.g. `"12%"`.
    fn cpu_load(&mut self) -> String;
    /// Memory in use as a percentage string.
    fn memory_usage(&mut self) -> String;
    fn uptime(&mut self) -> String;
}

/// Live metrics read through `sysinfo`.
pub struct SysinfoMetrics {
    system: System,
}

impl SysinfoMetrics {
    pub fn new() -> Self {
        let mut system = System::new();
        // CPU usage is a delta between refreshes; prime the first sample.
        system.refresh_cpu_usage();
        Self { system }
    }
}

impl Default for SysinfoMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMetrics for SysinfoMetrics {
    fn hostname(&mut self) -> String {
        System::host_name().unwrap_or_else(|| UNKNOWN_HOST.to_string())
    }

    fn ip_address(&mut self) -> String {
        let networks = Networks::new_with_refreshed_list();
        let candidates = networks.iter().flat_map(|(name, data)| {
            data.ip_networks()
                .iter()
                .map(move |net| (name.as_str(), net.addr))
        });
        pick_ip(candidates)
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| NO_NETWORK.to_string())
    }

    fn cpu_load(&mut self) -> String {
        self.system.refresh_cpu_usage();
        format_percent(self.system.global_cpu_usage())
    }

    fn memory_usage(&mut self) -> String {
        self.system.refresh_memory();
        format_percent(memory_percent(
            self.system.used_memory(),
            self.system.total_memory(),
        ))
    }

    fn uptime(&mut self) -> String {
        format_uptime(System::uptime())
    }
}

/// Fixed answers for demo mode and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMetrics {
    pub hostname: String,
    pub ip_address: String,
    pub cpu_load: String,
    pub memory_usage: String,
    pub uptime: String,
}

impl Default for StaticMetrics {
    fn default() -> Self {
        Self {
            hostname: "raspberrypi".into(),
            ip_address: "192.168.1.20".into(),
            cpu_load: "7%".into(),
            memory_usage: "31%".into(),
            uptime: "3h 12m".into(),
        }
    }
}

impl SystemMetrics for StaticMetrics {
    fn hostname(&mut self) -> String {
        self.hostname.clone()
    }

    fn ip_address(&mut self) -> String {
        self.ip_address.clone()
    }

    fn cpu_load(&mut self) -> String {
        self.cpu_load.clone()
    }

    fn memory_usage(&mut self) -> String {
        self.memory_usage.clone()
    }

    fn uptime(&mut self) -> String {
        self.uptime.clone()
    }
}

/// First IPv4 address not on loopback, by interface name so the pick is
/// stable across calls. Falls back to a global IPv6 address.
pub fn pick_ip<'a>(candidates: impl IntoIterator<Item = (&'a str, IpAddr)>) -> Option<IpAddr> {
    let mut found: Vec<(&str, IpAddr)> = candidates
        .into_iter()
        .filter(|(_, ip)| !ip.is_loopback() && !ip.is_unspecified())
        .collect();
    found.sort_by(|a, b| a.0.cmp(b.0));
    found
        .iter()
        .find(|(_, ip)| ip.is_ipv4())
        .or_else(|| {
            found.iter().find(|(_, ip)| match ip {
                // fe80::/10
                IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) != 0xfe80,
                IpAddr::V4(_) => false,
            })
        })
        .map(|(_, ip)| *ip)
}

pub fn memory_percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    ((used as f64 / total as f64) * 100.0) as f32
}

pub fn format_percent(value: f32) -> String {
    format!("{:.0}%", value.clamp(0.0, 100.0))
}

/// Minute resolution; seconds only matter right after boot.
pub fn format_uptime(secs: u64) -> String {
    let trimmed = if secs >= 60 { secs - secs % 60 } else { secs };
    humantime::format_duration(Duration::from_secs(trimmed)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn picks_first_non_loopback_ipv4() {
        let picked = pick_ip([
            ("lo", IpAddr::V4(Ipv4Addr::LOCALHOST)),
            ("wlan0", IpAddr::V4(Ipv4Addr::new(192, 168, 1, 44))),
            ("eth0", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))),
        ]);
        assert_eq!(picked, Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))));
    }

    #[test]
    fn falls_back_to_global_ipv6() {
        let global: Ipv6Addr = "2001:db8::5".parse().unwrap();
        let link_local: Ipv6Addr = "fe80::1".parse().unwrap();
        let picked = pick_ip([
            ("eth0", IpAddr::V6(link_local)),
            ("eth1", IpAddr::V6(global)),
        ]);
        assert_eq!(picked, Some(IpAddr::V6(global)));
    }

    #[test]
    fn no_candidates_yields_none() {
        assert_eq!(pick_ip([("lo", IpAddr::V4(Ipv4Addr::LOCALHOST))]), None);
    }

    #[test]
    fn formats_percentages() {
        assert_eq!(format_percent(12.4), "12%");
        assert_eq!(format_percent(140.0), "100%");
        assert_eq!(format_percent(memory_percent(512, 2048)), "25%");
        assert_eq!(format_percent(memory_percent(1, 0)), "0%");
    }

    #[test]
    fn uptime_drops_seconds_after_first_minute() {
        assert_eq!(format_uptime(42), "42s");
        assert_eq!(format_uptime(3_725), "1h 2m");
    }

    #[test]
    fn static_metrics_answers_verbatim() {
        let mut metrics = StaticMetrics::default();
        assert_eq!(metrics.hostname(), "raspberrypi");
        assert_eq!(metrics.cpu_load(), "7%");
    }
}
