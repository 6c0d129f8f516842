use std::fs;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use crate::MemoryPressure;

/// Pressure thresholds expressed as headroom per-mille (0-1000).
#[derive(Debug, Clone, Copy)]
pub struct MemoryPressureThresholds {
    pub moderate_headroom_per_mille: u16,
    pub severe_headroom_per_mille: u16,
}

impl Default for MemoryPressureThresholds {
    fn default() -> Self {
        Self {
            moderate_headroom_per_mille: 200,
            severe_headroom_per_mille: 100,
        }
    }
}

/// Background monitor that samples system memory headroom and emits pressure
/// updates over a channel.
///
/// The worker does blocking I/O off the UI thread; the host drains the
/// latest reading non-blockingly from its main loop and feeds it to
/// `ScreenshotStore::trim`. Pressure rises immediately but only falls after
/// a hold window, so one quiet sample never un-trims a struggling session.
pub struct MemoryPressureMonitor {
    receiver: Receiver<MemoryPressure>,
}

impl MemoryPressureMonitor {
    const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
    const HOLD_WINDOW: Duration = Duration::from_secs(3);

    pub fn start(thresholds: MemoryPressureThresholds) -> Self {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut last = MemoryPressure::Low;
            let mut last_raised = Instant::now();
            loop {
                if let Some(headroom) = sample_headroom_per_mille() {
                    let now = Instant::now();
                    let next = classify(headroom, &thresholds);
                    let filtered = if rank(next) >= rank(last) {
                        last_raised = now;
                        next
                    } else if now.duration_since(last_raised) >= Self::HOLD_WINDOW {
                        next
                    } else {
                        last
                    };
                    if filtered != last {
                        last = filtered;
                        if sender.send(filtered).is_err() {
                            break;
                        }
                    }
                }
                thread::sleep(Self::SAMPLE_INTERVAL);
            }
        });
        Self { receiver }
    }

    /// Returns the latest pressure update if one arrived since the last poll.
    pub fn drain_latest(&self) -> Option<MemoryPressure> {
        let mut latest = None;
        while let Ok(pressure) = self.receiver.try_recv() {
            latest = Some(pressure);
        }
        latest
    }
}

fn rank(pressure: MemoryPressure) -> u8 {
    match pressure {
        MemoryPressure::Low => 0,
        MemoryPressure::Moderate => 1,
        MemoryPressure::Severe => 2,
    }
}

fn classify(headroom_per_mille: u16, thresholds: &MemoryPressureThresholds) -> MemoryPressure {
    if headroom_per_mille <= thresholds.severe_headroom_per_mille {
        MemoryPressure::Severe
    } else if headroom_per_mille <= thresholds.moderate_headroom_per_mille {
        MemoryPressure::Moderate
    } else {
        MemoryPressure::Low
    }
}

fn sample_headroom_per_mille() -> Option<u16> {
    let meminfo = fs::read_to_string("/proc/meminfo").ok()?;
    let total = meminfo_value(&meminfo, "MemTotal:")?;
    let available = meminfo_value(&meminfo, "MemAvailable:")?;
    if total == 0 {
        return None;
    }
    Some((available.saturating_mul(1000) / total).min(1000) as u16)
}

fn meminfo_value(meminfo: &str, key: &str) -> Option<u64> {
    let line = meminfo.lines().find(|line| line.starts_with(key))?;
    line.split_whitespace().nth(1)?.parse().ok()
}
