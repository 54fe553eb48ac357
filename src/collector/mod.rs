// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 采集端模块
///
/// 接受Agent连接、维护客户端注册表并将指标帧分发到导出器
pub mod handler;
pub mod listener;
pub mod registry;

pub use handler::{ClientHandler, CloseReason, HandlerState, HandlerSummary};
pub use listener::CollectorListener;
pub use registry::ClientRegistry;
