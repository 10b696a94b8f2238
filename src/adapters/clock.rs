use crate::domain::ports::Clock;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Wall clock from chrono, boot time from `/proc/uptime` where the kernel exposes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn elapsed_realtime(&self) -> Option<Duration> {
        read_uptime()
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn read_uptime() -> Option<Duration> {
    let content = std::fs::read_to_string("/proc/uptime").ok()?;
    parse_uptime(&content)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn read_uptime() -> Option<Duration> {
    None
}

fn parse_uptime(content: &str) -> Option<Duration> {
    let seconds: f64 = content.split_whitespace().next()?.parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
}
