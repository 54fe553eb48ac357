// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心数据结构和能力接口，包括：
/// - 领域模型（models）：线路消息、指标类型和客户端记录
/// - 指标源（sources）：Agent采样能力接口
///
/// 领域层不依赖于任何外部实现。
pub mod models;
pub mod sources;
