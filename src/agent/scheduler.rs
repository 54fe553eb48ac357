// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::agent::connection::AgentConnection;
use crate::domain::models::metric::MetricFrame;
use crate::domain::sources::MetricSource;
use crate::utils::errors::{AgentError, WorkerError};
use crate::workers::Worker;

/// Agent调度器
///
/// 固定间隔循环：采样、为每个采样值构建一帧并发送、休眠固定间隔。
/// 休眠时间不扣除本周期耗时，因此会累积漂移。
pub struct AgentScheduler {
    connection: AgentConnection,
    source: Box<dyn MetricSource>,
    interval: Duration,
}

impl AgentScheduler {
    /// 创建调度器
    ///
    /// # 参数
    ///
    /// * `connection` - 到采集端的连接管理器
    /// * `source` - 指标源
    /// * `interval` - 采样间隔
    pub fn new(
        connection: AgentConnection,
        source: Box<dyn MetricSource>,
        interval: Duration,
    ) -> Self {
        Self {
            connection,
            source,
            interval,
        }
    }

    pub fn connection(&self) -> &AgentConnection {
        &self.connection
    }

    /// 执行一个调度周期（不休眠）
    ///
    /// # 返回值
    ///
    /// * `Ok(n)` - 本周期发送的帧数；采样失败时为0，超长帧不计入
    /// * `Err(AgentError)` - 重连重发后仍发送失败
    pub async fn tick(&mut self) -> Result<usize, AgentError> {
        let sample = match self.source.sample() {
            Ok(sample) => sample,
            Err(e) => {
                warn!(
                    agent = %self.connection.agent(),
                    source = self.source.name(),
                    error = %e,
                    "No data this tick"
                );
                return Ok(0);
            }
        };

        let kind = self.connection.registration().kind;
        let mut sent = 0;
        for (metric, value) in sample {
            let frame = MetricFrame::now(self.connection.agent(), metric, value, kind);
            match self.connection.send_frame(&frame).await {
                Ok(()) => sent += 1,
                Err(AgentError::Protocol(e)) if e.is_frame_local() => {
                    warn!(
                        agent = %self.connection.agent(),
                        metric = %frame.data.name,
                        error = %e,
                        "Skipping frame"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        debug!(agent = %self.connection.agent(), frames = sent, "Data sent to collector");
        Ok(sent)
    }
}

#[async_trait]
impl Worker for AgentScheduler {
    async fn run(&mut self) -> Result<(), WorkerError> {
        info!(
            agent = %self.connection.agent(),
            source = self.source.name(),
            interval_secs = self.interval.as_secs_f64(),
            "Starting agent"
        );

        if !self.connection.is_connected() {
            self.connection.connect().await;
        }

        loop {
            if let Err(e) = self.tick().await {
                error!(agent = %self.connection.agent(), error = %e, "Unrecoverable send failure");
                return Err(e.into());
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    fn name(&self) -> &str {
        self.connection.agent()
    }
}
