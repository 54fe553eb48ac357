// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::metric::MetricKind;
use thiserror::Error;

/// 线路协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("frame exceeds {max} bytes")]
    FrameTooLarge { max: usize },

    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// 是否仅影响当前帧（连接仍可继续读取）
    pub fn is_frame_local(&self) -> bool {
        !matches!(self, ProtocolError::Io(_))
    }
}

/// 指标导出器错误类型
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("invalid series name {0:?}")]
    InvalidName(String),

    #[error("series {name} is already registered as {existing}, cannot register as {requested}")]
    KindConflict {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },

    #[error("value {value} is not valid for a {kind} update")]
    InvalidValue { kind: MetricKind, value: f64 },

    #[error("invalid histogram buckets: {0}")]
    InvalidBuckets(String),
}

/// 帧分发错误类型
///
/// 均为单帧错误：记录日志并丢弃该帧，连接保持打开
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("malformed frame: {0}")]
    Decode(#[from] ProtocolError),

    #[error("frame type {received} does not match registered type {expected}")]
    KindMismatch {
        expected: MetricKind,
        received: MetricKind,
    },

    #[error("exporter rejected update: {0}")]
    Exporter(#[from] ExporterError),
}

/// 客户端注册表错误类型
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("exporter rejected registration: {0}")]
    Exporter(#[from] ExporterError),
}

/// 指标源错误类型
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("metric unavailable: {0}")]
    Unavailable(String),
}

/// Agent错误类型
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("send failed after reconnect: {0}")]
    SendFailed(#[source] ProtocolError),
}

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("worker task failed: {0}")]
    TaskFailed(String),
}

/// 采集端错误类型
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("cannot resolve listen address {0}")]
    Resolve(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("exporter error: {0}")]
    Exporter(#[from] ExporterError),
}

/// 判断I/O错误是否表示连接已断开（对端重置、中止或管道破裂）
pub fn is_connection_lost(error: &std::io::Error) -> bool {
    use std::io::ErrorKind;

    matches!(
        error.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
    )
}
