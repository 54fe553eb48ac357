// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::models::metric::MetricKind;
use crate::infrastructure::metrics::ExporterHandle;

/// 连接标识
///
/// 进程内单调分配，不随对端地址复用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    /// 分配下一个连接标识
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// 已注册客户端记录
///
/// 连接完成注册握手后创建，连接关闭或出错时销毁
#[derive(Clone)]
pub struct ClientRecord {
    /// 连接标识
    pub connection_id: ConnectionId,
    /// 对端地址
    pub peer: SocketAddr,
    /// 显示名称（导出器中的指标族名）
    pub display_name: String,
    /// 声明的指标类型，记录存续期间不可变
    pub kind: MetricKind,
    /// 导出器更新句柄
    pub exporter: ExporterHandle,
    /// 注册时间
    pub connected_at: DateTime<Utc>,
}

impl fmt::Debug for ClientRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRecord")
            .field("connection_id", &self.connection_id)
            .field("peer", &self.peer)
            .field("display_name", &self.display_name)
            .field("kind", &self.kind)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}
