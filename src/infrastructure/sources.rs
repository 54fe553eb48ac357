// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Deserialize;
use std::path::Path;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};

use crate::domain::sources::{MetricSource, Sample};
use crate::utils::errors::SourceError;

/// 指标源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Test,
    Memory,
    System,
}

/// 按类型构建指标源
///
/// # 参数
///
/// * `kind` - 指标源类型
/// * `metric` - 单值指标源使用的指标名（通常为Agent名称，使数值落在裸序列上）
pub fn build_source(kind: SourceKind, metric: &str) -> Box<dyn MetricSource> {
    match kind {
        SourceKind::Test => Box::new(TestSource::new(metric)),
        SourceKind::Memory => Box::new(MemorySource::new(metric)),
        SourceKind::System => Box::new(SystemSource::new()),
    }
}

/// 测试指标源
///
/// 每次采样返回一个按固定步长递增的数值
pub struct TestSource {
    metric: String,
    next: f64,
    step: f64,
}

impl TestSource {
    pub fn new(metric: impl Into<String>) -> Self {
        Self::with_values(metric, 0.0, 1.0)
    }

    pub fn with_values(metric: impl Into<String>, start: f64, step: f64) -> Self {
        Self {
            metric: metric.into(),
            next: start,
            step,
        }
    }
}

impl MetricSource for TestSource {
    fn name(&self) -> &str {
        "test"
    }

    fn sample(&mut self) -> Result<Sample, SourceError> {
        let value = self.next;
        self.next += self.step;
        Ok(Sample::from([(self.metric.clone(), value)]))
    }
}

/// 内存使用率指标源（百分比）
pub struct MemorySource {
    metric: String,
    system: System,
}

impl MemorySource {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            system: System::new_with_specifics(
                RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
            ),
        }
    }
}

impl MetricSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn sample(&mut self) -> Result<Sample, SourceError> {
        self.system.refresh_memory();
        let percent = memory_percent(&self.system)?;
        Ok(Sample::from([(self.metric.clone(), percent)]))
    }
}

/// 系统综合指标源
///
/// 采集CPU、内存、根分区磁盘使用率和网络发送字节数
pub struct SystemSource {
    system: System,
}

impl SystemSource {
    pub fn new() -> Self {
        let mut system = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );
        system.refresh_all();
        Self { system }
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SystemSource {
    fn name(&self) -> &str {
        "system"
    }

    fn sample(&mut self) -> Result<Sample, SourceError> {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let mut sample = Sample::new();
        sample.insert("cpu_count".to_string(), self.system.cpus().len() as f64);
        sample.insert(
            "cpu_percent".to_string(),
            self.system.global_cpu_usage() as f64,
        );
        sample.insert("memory_percent".to_string(), memory_percent(&self.system)?);

        let disks = Disks::new_with_refreshed_list();
        if let Some(root) = disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == Path::new("/"))
        {
            let total = root.total_space();
            if total > 0 {
                let used = total.saturating_sub(root.available_space());
                sample.insert(
                    "disk_percent".to_string(),
                    used as f64 / total as f64 * 100.0,
                );
            }
        }

        let networks = Networks::new_with_refreshed_list();
        let sent: u64 = networks
            .list()
            .values()
            .map(|data| data.total_transmitted())
            .sum();
        sample.insert("network_bytes_sent".to_string(), sent as f64);

        Ok(sample)
    }
}

fn memory_percent(system: &System) -> Result<f64, SourceError> {
    let total = system.total_memory();
    if total == 0 {
        return Err(SourceError::Unavailable(
            "total memory reported as zero".to_string(),
        ));
    }
    Ok(system.used_memory() as f64 / total as f64 * 100.0)
}
