// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供后台任务的生命周期管理
/// 每个Agent调度器作为一个工作器在独立任务中运行
pub mod manager;
pub mod worker;

pub use manager::WorkerManager;
pub use worker::Worker;
