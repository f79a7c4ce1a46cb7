use std::time::Duration;

#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::Instant;
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

/// 單一階段的耗時與處理筆數
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseStats {
    pub phase: String,
    pub measures: usize,
    pub duration: Duration,
    /// 無法讀取行程資訊時為 None
    pub memory_mb: Option<u64>,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy)]
struct ProcessSample {
    cpu_usage: f32,
    memory_mb: u64,
    peak_memory_mb: u64,
}

/// 記錄 extract / optimize / report 各階段的耗時與 CPU、記憶體
#[cfg(feature = "cli")]
pub struct ProcessMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    start_time: Instant,
    phase_start: Mutex<Instant>,
    peak_memory: Mutex<u64>,
    phases: Mutex<Vec<PhaseStats>>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl ProcessMonitor {
    pub fn new(enabled: bool) -> Self {
        let mut system = System::new_with_specifics(RefreshKind::everything());
        if enabled {
            system.refresh_all();
        }
        let now = Instant::now();

        Self {
            system: Mutex::new(system),
            pid: sysinfo::get_current_pid().ok(),
            start_time: now,
            phase_start: Mutex::new(now),
            peak_memory: Mutex::new(0),
            phases: Mutex::new(Vec::new()),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn sample(&self) -> Option<ProcessSample> {
        let mut system = self.system.lock().ok()?;
        system.refresh_all();
        let process = system.process(self.pid?)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = self.peak_memory.lock().ok()?;
        *peak = (*peak).max(memory_mb);

        Some(ProcessSample {
            cpu_usage: process.cpu_usage(),
            memory_mb,
            peak_memory_mb: *peak,
        })
    }

    /// 結束一個階段：記錄從上一階段結束到現在的耗時
    pub fn record_phase(&self, phase: &str, measures: usize) {
        if !self.enabled {
            return;
        }

        let duration = match self.phase_start.lock() {
            Ok(mut start) => {
                let now = Instant::now();
                let elapsed = now.duration_since(*start);
                *start = now;
                elapsed
            }
            Err(_) => Duration::ZERO,
        };

        let sample = self.sample();
        match sample {
            Some(stats) => tracing::info!(
                "📊 {} - {} measure(s) in {:?}, CPU: {:.1}%, Memory: {}MB, Peak: {}MB",
                phase,
                measures,
                duration,
                stats.cpu_usage,
                stats.memory_mb,
                stats.peak_memory_mb
            ),
            None => tracing::info!("📊 {} - {} measure(s) in {:?}", phase, measures, duration),
        }

        if let Ok(mut phases) = self.phases.lock() {
            phases.push(PhaseStats {
                phase: phase.to_string(),
                measures,
                duration,
                memory_mb: sample.map(|stats| stats.memory_mb),
            });
        }
    }

    pub fn phases(&self) -> Vec<PhaseStats> {
        self.phases
            .lock()
            .map(|phases| phases.clone())
            .unwrap_or_default()
    }

    pub fn log_final_stats(&self) {
        if !self.enabled {
            return;
        }

        let peak = self.peak_memory.lock().map(|peak| *peak).unwrap_or(0);
        let phases = self.phases();
        let slowest = phases.iter().max_by_key(|stats| stats.duration);

        tracing::info!(
            "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
            self.start_time.elapsed(),
            peak
        );
        if let Some(stats) = slowest {
            tracing::info!("🐢 Slowest phase: {} ({:?})", stats.phase, stats.duration);
        }
    }
}

#[cfg(feature = "cli")]
impl Default for ProcessMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 建置時不收集任何資料
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct ProcessMonitor;

#[cfg(not(feature = "cli"))]
impl ProcessMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn is_enabled(&self) -> bool {
        false
    }

    pub fn record_phase(&self, _phase: &str, _measures: usize) {}

    pub fn phases(&self) -> Vec<PhaseStats> {
        Vec::new()
    }

    pub fn log_final_stats(&self) {}
}
