// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tokio::signal;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;

/// 工作管理器
///
/// 每个工作器一个任务；任一工作器返回错误即视为整个进程的致命错误
#[derive(Default)]
pub struct WorkerManager {
    handles: JoinSet<(String, Result<(), WorkerError>)>,
}

impl WorkerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在独立任务中启动工作器
    pub fn spawn(&mut self, mut worker: Box<dyn Worker>) {
        let name = worker.name().to_string();
        info!(worker = %name, "Starting worker");
        self.handles.spawn(async move {
            let result = worker.run().await;
            (name, result)
        });
    }

    /// 运行中的工作器数量
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// 等待工作器结束
    ///
    /// 返回第一个失败工作器的错误并中止其余工作器；全部正常结束时返回`Ok`
    pub async fn wait(&mut self) -> Result<(), WorkerError> {
        while let Some(joined) = self.handles.join_next().await {
            let failure = match joined {
                Ok((name, Ok(()))) => {
                    info!(worker = %name, "Worker finished");
                    None
                }
                Ok((name, Err(e))) => {
                    error!(worker = %name, error = %e, "Worker failed");
                    Some(e)
                }
                Err(e) => Some(WorkerError::TaskFailed(e.to_string())),
            };

            if let Some(e) = failure {
                self.handles.abort_all();
                return Err(e);
            }
        }
        Ok(())
    }

    /// 等待关闭信号或工作器失败
    ///
    /// 收到关闭信号时中止所有工作器
    pub async fn wait_for_shutdown(&mut self) -> Result<(), WorkerError> {
        tokio::select! {
            result = self.wait() => result,
            signal = signal::ctrl_c() => {
                match signal {
                    Ok(()) => info!("Shutdown signal received"),
                    Err(err) => error!("Unable to listen for shutdown signal: {}", err),
                }

                info!("Shutting down workers...");
                self.handles.abort_all();
                info!("Workers shut down successfully");
                Ok(())
            }
        }
    }
}
