// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Agent模块
///
/// 连接管理与固定间隔调度
pub mod connection;
pub mod scheduler;

pub use connection::AgentConnection;
pub use scheduler::AgentScheduler;
