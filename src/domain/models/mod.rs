// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 包含线路消息、指标类型和客户端记录
pub mod client;
pub mod metric;
