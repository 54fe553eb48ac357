// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 包含的子模块：
/// - 指标（metrics）：基于Prometheus记录器的导出器实现
/// - 指标源（sources）：Agent端的测试、内存和系统指标源
pub mod metrics;
pub mod sources;
