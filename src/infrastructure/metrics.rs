// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use metrics::{Key, KeyName, Label, Level, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::domain::models::metric::{MetricKind, MetricSample, UpdateOp};
use crate::utils::errors::ExporterError;

/// Prometheus默认直方图分桶
pub const DEFAULT_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// 采样名与注册名不同时使用的标签
pub const SAMPLE_LABEL: &str = "metric";

/// 累计值取整时容忍的浮点误差
const COUNTER_EPSILON: f64 = 1e-9;

/// 指标导出器
///
/// 可被拉取式抓取的内存指标注册表，支持gauge/counter/histogram/summary
pub trait MetricExporter: Send + Sync {
    /// 以指定类型注册一个指标族，返回更新句柄
    ///
    /// 同名同类型的重复注册共享同一个指标族；同名不同类型返回`KindConflict`
    fn register(&self, name: &str, kind: MetricKind) -> Result<ExporterHandle, ExporterError>;

    /// 以文本暴露格式渲染所有已注册的指标
    fn render(&self) -> String;

    /// 已注册的指标族数量
    fn family_count(&self) -> usize;

    /// 查询已注册指标族的类型
    fn kind_of(&self, name: &str) -> Option<MetricKind>;

    /// 清理分布类指标的待合并样本
    ///
    /// 未被抓取时需要周期调用，否则样本会一直堆积
    fn run_upkeep(&self);
}

/// 指标族更新句柄
#[derive(Clone)]
pub struct ExporterHandle {
    family: Arc<SeriesFamily>,
}

struct SeriesFamily {
    name: String,
    kind: MetricKind,
    recorder: Arc<PrometheusRecorder>,
    series: DashMap<String, Series>,
}

#[derive(Clone)]
enum Series {
    Gauge(metrics::Gauge),
    /// 记录器计数器只接受整数，浮点累计值单独保存（f64位模式）
    Counter(metrics::Counter, Arc<AtomicU64>),
    Distribution(metrics::Histogram),
}

impl ExporterHandle {
    pub fn name(&self) -> &str {
        &self.family.name
    }

    pub fn kind(&self) -> MetricKind {
        self.family.kind
    }

    /// 将一个采样值按指标族类型应用到对应序列
    ///
    /// 采样名等于注册名时更新裸序列，否则更新带`metric`标签的序列
    pub fn apply(&self, sample: &MetricSample) -> Result<(), ExporterError> {
        let kind = self.family.kind;
        let value = sample.value;

        match (kind.operation(), self.family.series_for(&sample.name)) {
            (UpdateOp::Set, Series::Gauge(gauge)) => {
                if !value.is_finite() {
                    return Err(ExporterError::InvalidValue { kind, value });
                }
                gauge.set(value);
            }
            (UpdateOp::Increment, Series::Counter(counter, total)) => {
                if !value.is_finite() || value < 0.0 {
                    return Err(ExporterError::InvalidValue { kind, value });
                }
                let total = accumulate(&total, value);
                counter.absolute((total + COUNTER_EPSILON).floor() as u64);
            }
            (UpdateOp::Observe, Series::Distribution(histogram)) => {
                if !value.is_finite() {
                    return Err(ExporterError::InvalidValue { kind, value });
                }
                histogram.record(value);
            }
            // series_for always builds the series matching the family kind
            _ => return Err(ExporterError::InvalidValue { kind, value }),
        }

        Ok(())
    }
}

impl SeriesFamily {
    fn series_for(&self, sample: &str) -> Series {
        if let Some(series) = self.series.get(sample) {
            return series.clone();
        }

        self.series
            .entry(sample.to_string())
            .or_insert_with(|| {
                let key = if sample == self.name {
                    Key::from_name(self.name.clone())
                } else {
                    Key::from_parts(
                        self.name.clone(),
                        vec![Label::new(SAMPLE_LABEL, sample.to_string())],
                    )
                };
                let metadata = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));

                debug!(family = %self.name, sample, kind = %self.kind, "Creating series");
                match self.kind {
                    MetricKind::Gauge => {
                        Series::Gauge(self.recorder.register_gauge(&key, &metadata))
                    }
                    MetricKind::Counter => {
                        Series::Counter(
                            self.recorder.register_counter(&key, &metadata),
                            Arc::new(AtomicU64::new(0.0_f64.to_bits())),
                        )
                    }
                    MetricKind::Histogram | MetricKind::Summary => {
                        Series::Distribution(self.recorder.register_histogram(&key, &metadata))
                    }
                }
            })
            .clone()
    }
}

/// 基于metrics-exporter-prometheus的导出器
///
/// 直方图类型使用配置了分桶的记录器，summary类型使用默认记录器（按分位数渲染）
pub struct PrometheusExporter {
    quantile: Arc<PrometheusRecorder>,
    bucketed: Arc<PrometheusRecorder>,
    quantile_handle: PrometheusHandle,
    bucketed_handle: PrometheusHandle,
    families: DashMap<String, ExporterHandle>,
}

impl PrometheusExporter {
    /// 创建新的导出器
    ///
    /// # 参数
    ///
    /// * `buckets` - 直方图类型指标使用的分桶上界
    pub fn new(buckets: &[f64]) -> Result<Self, ExporterError> {
        let quantile = PrometheusBuilder::new().build_recorder();
        let bucketed = PrometheusBuilder::new()
            .set_buckets(buckets)
            .map_err(|e| ExporterError::InvalidBuckets(e.to_string()))?
            .build_recorder();

        Ok(Self {
            quantile_handle: quantile.handle(),
            bucketed_handle: bucketed.handle(),
            quantile: Arc::new(quantile),
            bucketed: Arc::new(bucketed),
            families: DashMap::new(),
        })
    }

    fn recorder_for(&self, kind: MetricKind) -> Arc<PrometheusRecorder> {
        match kind {
            MetricKind::Histogram => self.bucketed.clone(),
            _ => self.quantile.clone(),
        }
    }
}

impl MetricExporter for PrometheusExporter {
    fn register(&self, name: &str, kind: MetricKind) -> Result<ExporterHandle, ExporterError> {
        if !is_valid_metric_name(name) {
            return Err(ExporterError::InvalidName(name.to_string()));
        }

        match self.families.entry(name.to_string()) {
            Entry::Occupied(entry) => {
                let existing = entry.get().kind();
                if existing != kind {
                    return Err(ExporterError::KindConflict {
                        name: name.to_string(),
                        existing,
                        requested: kind,
                    });
                }
                Ok(entry.get().clone())
            }
            Entry::Vacant(entry) => {
                let recorder = self.recorder_for(kind);
                let key_name = KeyName::from(name.to_string());
                let description = SharedString::from(format!("{kind} pushed by agent {name}"));
                match kind {
                    MetricKind::Gauge => recorder.describe_gauge(key_name, None, description),
                    MetricKind::Counter => recorder.describe_counter(key_name, None, description),
                    MetricKind::Histogram | MetricKind::Summary => {
                        recorder.describe_histogram(key_name, None, description)
                    }
                }

                let handle = ExporterHandle {
                    family: Arc::new(SeriesFamily {
                        name: name.to_string(),
                        kind,
                        recorder,
                        series: DashMap::new(),
                    }),
                };
                // Materialize the bare series so the family shows up before the first update.
                handle.family.series_for(name);

                entry.insert(handle.clone());
                Ok(handle)
            }
        }
    }

    fn render(&self) -> String {
        let mut output = self.quantile_handle.render();
        output.push_str(&self.bucketed_handle.render());
        output
    }

    fn family_count(&self) -> usize {
        self.families.len()
    }

    fn kind_of(&self, name: &str) -> Option<MetricKind> {
        self.families.get(name).map(|handle| handle.kind())
    }

    fn run_upkeep(&self) {
        self.quantile_handle.run_upkeep();
        self.bucketed_handle.run_upkeep();
    }
}

/// 将增量加到浮点累计值上，返回新的累计值
fn accumulate(total: &AtomicU64, delta: f64) -> f64 {
    let previous = total
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
            Some((f64::from_bits(bits) + delta).to_bits())
        })
        .unwrap_or_else(|bits| bits);
    f64::from_bits(previous) + delta
}

/// 校验Prometheus指标名：`[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
