// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Agent模块
///
/// 连接采集端、周期采样并推送指标帧
pub mod agent;

/// 采集端模块
///
/// 接受Agent连接、维护客户端注册表并分发指标帧
pub mod collector;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含线路消息、客户端记录和指标源接口
pub mod domain;

/// 基础设施模块
///
/// 提供Prometheus导出器和具体指标源
pub mod infrastructure;

/// 表示层模块
///
/// 抓取端点的路由和处理器
pub mod presentation;

/// 线路协议模块
pub mod protocol;

/// 工具模块
///
/// 错误类型和日志初始化
pub mod utils;

/// 工作器模块
///
/// 后台任务的生命周期管理
pub mod workers;
