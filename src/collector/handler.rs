// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collector::registry::ClientRegistry;
use crate::domain::models::client::ClientRecord;
use crate::protocol::{decode_frame, next_frame, FrameReader};
use crate::utils::errors::{is_connection_lost, DispatchError, ProtocolError};

/// 连接处理器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// 注册握手已完成
    Registered,
    /// 正在读取并分发指标帧
    Streaming,
    /// 终止状态，记录已注销
    Closed,
}

/// 连接关闭原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// 对端干净关闭（读到0字节）
    PeerClosed,
    /// 对端重置或中止连接
    PeerReset,
    /// 其他I/O错误
    ReadError,
    /// 采集端关闭
    Cancelled,
}

/// 连接处理结果汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerSummary {
    /// 处理器结束时的状态
    pub state: HandlerState,
    pub frames_dispatched: u64,
    pub frames_dropped: u64,
    pub reason: CloseReason,
}

/// 客户端连接处理器
///
/// 每个连接一个，在独立任务中运行。按客户端注册时声明的类型将每帧数值分发到导出器；
/// 格式错误的帧只记录日志并丢弃，不关闭连接。
pub struct ClientHandler<R> {
    record: Arc<ClientRecord>,
    registry: ClientRegistry,
    reader: FrameReader<R>,
    cancel: CancellationToken,
    state: HandlerState,
    frames_dispatched: u64,
    frames_dropped: u64,
}

impl<R> ClientHandler<R>
where
    R: AsyncRead + Unpin,
{
    /// 创建连接处理器
    ///
    /// # 参数
    ///
    /// * `record` - 已注册的客户端记录
    /// * `registry` - 关闭时用于注销的注册表
    /// * `reader` - 握手后继续使用的分帧读取端（保留已缓冲的数据）
    /// * `cancel` - 采集端关闭信号
    pub fn new(
        record: Arc<ClientRecord>,
        registry: ClientRegistry,
        reader: FrameReader<R>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            record,
            registry,
            reader,
            cancel,
            state: HandlerState::Registered,
            frames_dispatched: 0,
            frames_dropped: 0,
        }
    }

    /// 运行处理循环直到连接关闭
    pub async fn run(mut self) -> HandlerSummary {
        self.state = HandlerState::Streaming;
        let conn_id = self.record.connection_id;

        let reason = loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => break CloseReason::Cancelled,
                next = next_frame(&mut self.reader) => next,
            };

            match next {
                None => break CloseReason::PeerClosed,
                Some(Ok(line)) => {
                    debug!(
                        conn_id = %conn_id,
                        client = %self.record.display_name,
                        frame = %line,
                        "Received frame"
                    );
                    match self.dispatch(&line) {
                        Ok(()) => self.frames_dispatched += 1,
                        Err(e) => {
                            self.frames_dropped += 1;
                            error!(
                                conn_id = %conn_id,
                                client = %self.record.display_name,
                                error = %e,
                                "Dropping frame"
                            );
                        }
                    }
                }
                Some(Err(e)) if e.is_frame_local() => {
                    self.frames_dropped += 1;
                    error!(
                        conn_id = %conn_id,
                        client = %self.record.display_name,
                        error = %e,
                        "Dropping frame"
                    );
                }
                Some(Err(ProtocolError::Io(e))) if is_connection_lost(&e) => {
                    warn!(
                        conn_id = %conn_id,
                        client = %self.record.display_name,
                        error = %e,
                        "Client connection lost"
                    );
                    break CloseReason::PeerReset;
                }
                Some(Err(e)) => {
                    error!(
                        conn_id = %conn_id,
                        client = %self.record.display_name,
                        error = %e,
                        "Read failed, closing connection"
                    );
                    break CloseReason::ReadError;
                }
            }
        };

        self.close(reason)
    }

    /// 解码一帧并按客户端类型分发到导出器
    fn dispatch(&self, line: &str) -> Result<(), DispatchError> {
        let frame = decode_frame(line)?;

        if frame.kind != self.record.kind {
            return Err(DispatchError::KindMismatch {
                expected: self.record.kind,
                received: frame.kind,
            });
        }
        if frame.name != self.record.display_name {
            warn!(
                conn_id = %self.record.connection_id,
                client = %self.record.display_name,
                frame_name = %frame.name,
                "Frame name differs from registered name"
            );
        }

        self.record.exporter.apply(&frame.data)?;
        Ok(())
    }

    fn close(mut self, reason: CloseReason) -> HandlerSummary {
        self.state = HandlerState::Closed;
        self.registry.unregister(self.record.connection_id);

        let summary = HandlerSummary {
            state: self.state,
            frames_dispatched: self.frames_dispatched,
            frames_dropped: self.frames_dropped,
            reason,
        };
        info!(
            conn_id = %self.record.connection_id,
            client = %self.record.display_name,
            peer = %self.record.peer,
            dispatched = summary.frames_dispatched,
            dropped = summary.frames_dropped,
            reason = ?reason,
            "Client disconnected"
        );
        summary
    }
}
