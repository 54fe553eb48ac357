// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::BTreeMap;

use crate::utils::errors::SourceError;

/// 一次采样的结果：指标名到数值
pub type Sample = BTreeMap<String, f64>;

/// 指标源
///
/// 调度器每个周期调用一次`sample`。采样失败表示本周期无数据，不会中断调度。
pub trait MetricSource: Send {
    /// 指标源名称，用于日志
    fn name(&self) -> &str;

    /// 采集当前数值
    fn sample(&mut self) -> Result<Sample, SourceError>;
}
