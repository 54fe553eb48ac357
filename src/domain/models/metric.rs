// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 线路时间戳格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 指标类型
///
/// 决定采集端对数值执行的导出器更新操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// 瞬时值
    Gauge,
    /// 单调递增计数
    Counter,
    /// 分桶分布
    Histogram,
    /// 分位数分布
    Summary,
}

/// 导出器更新操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Set,
    Increment,
    Observe,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Gauge,
        MetricKind::Counter,
        MetricKind::Histogram,
        MetricKind::Summary,
    ];

    /// 线路上使用的类型字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        }
    }

    /// 类型到导出器操作的分发表
    ///
    /// 两端共用这一张表，采集端据此决定如何应用一个数值
    pub fn operation(&self) -> UpdateOp {
        match self {
            MetricKind::Gauge => UpdateOp::Set,
            MetricKind::Counter => UpdateOp::Increment,
            MetricKind::Histogram | MetricKind::Summary => UpdateOp::Observe,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 注册消息
///
/// Agent在每次连接成功后立即发送一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationMessage {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
}

impl RegistrationMessage {
    pub fn new(name: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// 单个采样值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
}

/// 指标帧
///
/// 每个调度周期每个采样值对应一帧，一帧即一条线路消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFrame {
    /// Agent显示名称
    pub name: String,
    #[serde(with = "wire_timestamp")]
    pub timestamp: NaiveDateTime,
    pub data: MetricSample,
    #[serde(rename = "type")]
    pub kind: MetricKind,
}

impl MetricFrame {
    /// 以当前本地时间创建指标帧
    pub fn now(
        agent: impl Into<String>,
        sample: impl Into<String>,
        value: f64,
        kind: MetricKind,
    ) -> Self {
        let now = Local::now().naive_local();
        Self {
            name: agent.into(),
            timestamp: now.with_nanosecond(0).unwrap_or(now),
            data: MetricSample {
                name: sample.into(),
                value,
            },
            kind,
        }
    }
}

mod wire_timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(|_| {
            de::Error::custom(format!(
                "invalid timestamp {raw:?}, expected YYYY-MM-DD HH:MM:SS"
            ))
        })
    }
}
