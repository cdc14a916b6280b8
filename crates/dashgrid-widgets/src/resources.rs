//! CPU, memory, swap, disk, network and load from `/proc`.
//!
//! The scheduled `update` reads and parses the files; `draw` only formats
//! the last [`Snapshot`]. CPU usage and network rates are deltas against the
//! counters of the previous update, which live in the widget's internal data.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use dashgrid_core::{Content, Plugin, WidgetError};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Gauge, Paragraph};

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Aggregate CPU time from the first line of `/proc/stat`, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

/// Bytes moved by every interface except loopback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetBytes {
    pub received: u64,
    pub sent: u64,
}

/// Monotonic counters that only mean something as a difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub cpu: CpuTimes,
    pub net: NetBytes,
}

/// Network throughput in bytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NetRate {
    pub received: f64,
    pub sent: f64,
}

/// Size of the filesystem holding the configured path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

/// One reading of the system counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// 1, 5 and 15 minute load averages.
    pub load: [f64; 3],
    /// `MemTotal` in KiB.
    pub mem_total_kib: u64,
    /// `MemAvailable` in KiB.
    pub mem_available_kib: u64,
    /// `SwapTotal` in KiB.
    pub swap_total_kib: u64,
    /// `SwapFree` in KiB.
    pub swap_free_kib: u64,
    /// Time since boot.
    pub uptime: Duration,
    /// Raw counters this reading was taken from.
    pub counters: Counters,
    /// CPU busy percentage since the previous reading.
    pub cpu_percent: Option<f64>,
    /// Throughput since the previous reading.
    pub net_rate: Option<NetRate>,
    /// `None` when the filesystem could not be queried.
    pub disk: Option<DiskUsage>,
}

impl Snapshot {
    /// Read `/proc`.
    pub fn read() -> Result<Self, WidgetError> {
        Self::read_from(Path::new("/proc"))
    }

    /// Read `loadavg`, `meminfo`, `uptime`, `stat` and `net/dev` below `root`.
    ///
    /// Rates and disk usage are left empty.
    pub fn read_from(root: &Path) -> Result<Self, WidgetError> {
        if !cfg!(target_os = "linux") {
            return Err(WidgetError::failed(format!(
                "resources is not supported on {}",
                std::env::consts::OS
            )));
        }
        let read = |name: &str| {
            let path = root.join(name);
            fs::read_to_string(&path)
                .map_err(|e| WidgetError::failed(format!("{}: {e}", path.display())))
        };
        let meminfo = parse_meminfo(&read("meminfo")?)?;
        Ok(Self {
            load: parse_loadavg(&read("loadavg")?)?,
            mem_total_kib: meminfo.mem_total,
            mem_available_kib: meminfo.mem_available,
            swap_total_kib: meminfo.swap_total,
            swap_free_kib: meminfo.swap_free,
            uptime: parse_uptime(&read("uptime")?)?,
            counters: Counters {
                cpu: parse_cpu_times(&read("stat")?)?,
                net: parse_net_dev(&read("net/dev")?)?,
            },
            cpu_percent: None,
            net_rate: None,
            disk: None,
        })
    }

    /// Fill in CPU usage and network rates from `previous` counters taken
    /// `elapsed` ago.
    pub fn apply_deltas(&mut self, previous: &Counters, elapsed: Duration) {
        let cpu = &self.counters.cpu;
        let total = cpu.total.saturating_sub(previous.cpu.total);
        let busy = cpu.busy.saturating_sub(previous.cpu.busy);
        self.cpu_percent = Some(if total == 0 {
            0.0
        } else {
            (busy as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        });

        let seconds = elapsed.as_secs_f64();
        let per_second = |now: u64, before: u64| {
            if seconds > 0.0 {
                now.saturating_sub(before) as f64 / seconds
            } else {
                0.0
            }
        };
        let net = &self.counters.net;
        self.net_rate = Some(NetRate {
            received: per_second(net.received, previous.net.received),
            sent: per_second(net.sent, previous.net.sent),
        });
    }

    /// Fraction of memory in use, in `0.0..=1.0`.
    pub fn mem_used_ratio(&self) -> f64 {
        if self.mem_total_kib == 0 {
            return 0.0;
        }
        let used = self.mem_total_kib.saturating_sub(self.mem_available_kib);
        (used as f64 / self.mem_total_kib as f64).clamp(0.0, 1.0)
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let [one, five, fifteen] = self.load;
        let cpu = match self.cpu_percent {
            Some(percent) => format!("{percent:4.1}%"),
            None => "--".to_string(),
        };
        let disk = match self.disk {
            Some(disk) => format!(
                "{:.1} / {:.1} GiB",
                disk.total_bytes.saturating_sub(disk.free_bytes) as f64 / GIB,
                disk.total_bytes as f64 / GIB
            ),
            None => "--".to_string(),
        };
        let net = match self.net_rate {
            Some(rate) => format!(
                "up {:.2} down {:.2} MiB/s",
                rate.sent / MIB,
                rate.received / MIB
            ),
            None => "--".to_string(),
        };
        vec![
            Line::from(format!("CPU   {cpu}")),
            Line::from(format!("Load  {one:.2} {five:.2} {fifteen:.2}")),
            Line::from(format!(
                "Mem   {} / {} MiB",
                self.mem_total_kib.saturating_sub(self.mem_available_kib) / 1024,
                self.mem_total_kib / 1024
            )),
            Line::from(format!(
                "Swap  {} / {} MiB",
                self.swap_total_kib.saturating_sub(self.swap_free_kib) / 1024,
                self.swap_total_kib / 1024
            )),
            Line::from(format!("Disk  {disk}")),
            Line::from(format!("Net   {net}")),
            Line::from(format!("Up    {}", format_uptime(self.uptime))),
        ]
    }
}

/// First three fields of `/proc/loadavg`.
pub fn parse_loadavg(text: &str) -> Result<[f64; 3], WidgetError> {
    let mut fields = text.split_whitespace().map(str::parse::<f64>);
    let mut load = [0.0; 3];
    for slot in &mut load {
        *slot = match fields.next() {
            Some(Ok(value)) => value,
            _ => return Err(WidgetError::failed("malformed loadavg")),
        };
    }
    Ok(load)
}

/// The `/proc/meminfo` fields the plugin shows, in KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_available: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

/// Memory and swap totals from `/proc/meminfo`.
///
/// Swap fields default to zero; the memory fields are required.
pub fn parse_meminfo(text: &str) -> Result<MemInfo, WidgetError> {
    let field = |key: &str| {
        text.lines()
            .find_map(|line| line.strip_prefix(key)?.strip_prefix(':'))
            .and_then(|rest| rest.split_whitespace().next()?.parse::<u64>().ok())
    };
    let required = |key: &str| field(key).ok_or_else(|| WidgetError::failed(format!("meminfo has no {key}")));
    Ok(MemInfo {
        mem_total: required("MemTotal")?,
        mem_available: required("MemAvailable")?,
        swap_total: field("SwapTotal").unwrap_or(0),
        swap_free: field("SwapFree").unwrap_or(0),
    })
}

/// Busy and total ticks from the aggregate `cpu` line of `/proc/stat`.
///
/// Idle and iowait count as idle. Guest time is already part of user time,
/// so only the first eight columns are summed.
pub fn parse_cpu_times(text: &str) -> Result<CpuTimes, WidgetError> {
    let malformed = || WidgetError::failed("malformed stat");
    let line = text
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))
        .ok_or_else(malformed)?;
    let fields = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(str::parse::<u64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| malformed())?;
    if fields.len() < 4 {
        return Err(malformed());
    }
    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Ok(CpuTimes {
        busy: total.saturating_sub(idle),
        total,
    })
}

/// Received and sent bytes summed over `/proc/net/dev`, loopback excluded.
pub fn parse_net_dev(text: &str) -> Result<NetBytes, WidgetError> {
    let mut bytes = NetBytes::default();
    for line in text.lines().skip(2) {
        let Some((interface, counters)) = line.split_once(':') else {
            continue;
        };
        if interface.trim() == "lo" {
            continue;
        }
        let fields: Vec<&str> = counters.split_whitespace().collect();
        let parse = |index: usize| {
            fields
                .get(index)
                .and_then(|field| field.parse::<u64>().ok())
                .ok_or_else(|| WidgetError::failed(format!("malformed net/dev line for {}", interface.trim())))
        };
        bytes.received = bytes.received.saturating_add(parse(0)?);
        bytes.sent = bytes.sent.saturating_add(parse(8)?);
    }
    Ok(bytes)
}

/// Total and free bytes of the filesystem holding `path`.
#[cfg(unix)]
pub fn disk_usage(path: &Path) -> Result<DiskUsage, WidgetError> {
    let stat = nix::sys::statvfs::statvfs(path)
        .map_err(|e| WidgetError::failed(format!("{}: {e}", path.display())))?;
    let fragment = u64::from(stat.fragment_size());
    Ok(DiskUsage {
        total_bytes: u64::from(stat.blocks()).saturating_mul(fragment),
        free_bytes: u64::from(stat.blocks_free()).saturating_mul(fragment),
    })
}

#[cfg(not(unix))]
pub fn disk_usage(path: &Path) -> Result<DiskUsage, WidgetError> {
    Err(WidgetError::failed(format!(
        "disk usage of {} is not supported on {}",
        path.display(),
        std::env::consts::OS
    )))
}

/// Seconds since boot from `/proc/uptime`.
pub fn parse_uptime(text: &str) -> Result<Duration, WidgetError> {
    text.split_whitespace()
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64)
        .ok_or_else(|| WidgetError::failed("malformed uptime"))
}

/// `3d 04:05` style uptime.
pub fn format_uptime(uptime: Duration) -> String {
    let minutes = uptime.as_secs() / 60;
    let (days, hours, minutes) = (minutes / 1440, minutes / 60 % 24, minutes % 60);
    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}")
    } else {
        format!("{hours:02}:{minutes:02}")
    }
}

/// Counters of the previous update.
struct Previous {
    counters: Counters,
    at: Instant,
}

/// The `resources` plugin. Options: `disk` (default `"/"`), the path whose
/// filesystem is reported.
pub fn plugin() -> Plugin {
    Plugin::new(|ctx, content| {
        let Some(snapshot) = content.and_then(Content::downcast_ref::<Snapshot>) else {
            return Ok(());
        };
        let lines = snapshot.lines();
        let rows = lines.len() as u16;
        ctx.canvas.render(Paragraph::new(lines));
        let width = ctx.canvas.width();
        if ctx.canvas.height() > rows {
            let ratio = snapshot.mem_used_ratio();
            let color = if ratio > 0.9 { Color::Red } else { Color::Green };
            ctx.canvas.render_in(
                Rect::new(0, rows, width, 1),
                Gauge::default().gauge_style(Style::default().fg(color)).ratio(ratio),
            );
        }
        Ok(())
    })
    .with_update(|ctx| {
        let mut snapshot = Snapshot::read()?;
        let now = Instant::now();
        if let Some(previous) = ctx.data.get::<Previous>() {
            snapshot.apply_deltas(&previous.counters, now.saturating_duration_since(previous.at));
        }
        ctx.data.insert(Previous {
            counters: snapshot.counters,
            at: now,
        });

        let path = ctx.widget.config().option_str("disk").unwrap_or("/");
        snapshot.disk = match disk_usage(Path::new(path)) {
            Ok(disk) => Some(disk),
            Err(e) => {
                tracing::debug!(error = %e, "disk usage unavailable");
                None
            }
        };
        Ok(Content::new(snapshot))
    })
}
