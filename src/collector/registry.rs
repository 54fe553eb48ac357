// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::models::client::{ClientRecord, ConnectionId};
use crate::domain::models::metric::RegistrationMessage;
use crate::infrastructure::metrics::MetricExporter;
use crate::utils::errors::RegistryError;

/// 客户端注册表
///
/// 连接标识到客户端记录的并发映射。监听器和每个连接处理器都持有同一实例的克隆，
/// 所有修改在内部同步，调用方无需额外加锁。
#[derive(Clone)]
pub struct ClientRegistry {
    /// 存储每个连接的客户端记录
    clients: Arc<DashMap<ConnectionId, Arc<ClientRecord>>>,
    /// 指标导出器
    exporter: Arc<dyn MetricExporter>,
}

impl ClientRegistry {
    /// 创建一个新的客户端注册表
    ///
    /// # 参数
    ///
    /// * `exporter` - 为每个注册分配指标句柄的导出器
    pub fn new(exporter: Arc<dyn MetricExporter>) -> Self {
        Self {
            clients: Arc::new(DashMap::new()),
            exporter,
        }
    }

    /// 注册客户端
    ///
    /// 在导出器中以声明的类型分配指标句柄，并保存客户端记录
    ///
    /// # 参数
    ///
    /// * `connection_id` - 连接标识
    /// * `peer` - 对端地址
    /// * `message` - 客户端发送的注册消息
    ///
    /// # 返回值
    ///
    /// * `Ok(Arc<ClientRecord>)` - 新建的客户端记录
    /// * `Err(RegistryError)` - 导出器拒绝了该名称或类型
    pub fn register(
        &self,
        connection_id: ConnectionId,
        peer: SocketAddr,
        message: &RegistrationMessage,
    ) -> Result<Arc<ClientRecord>, RegistryError> {
        let exporter = self.exporter.register(&message.name, message.kind)?;

        let record = Arc::new(ClientRecord {
            connection_id,
            peer,
            display_name: message.name.clone(),
            kind: message.kind,
            exporter,
            connected_at: Utc::now(),
        });
        self.clients.insert(connection_id, record.clone());

        info!(
            conn_id = %connection_id,
            %peer,
            client = %record.display_name,
            kind = %record.kind,
            clients = self.clients.len(),
            "Client registered"
        );
        Ok(record)
    }

    /// 注销客户端
    ///
    /// 记录不存在时不做任何事
    pub fn unregister(&self, connection_id: ConnectionId) -> Option<Arc<ClientRecord>> {
        let removed = self.clients.remove(&connection_id).map(|(_, record)| record);
        match &removed {
            Some(record) => info!(
                conn_id = %connection_id,
                client = %record.display_name,
                clients = self.clients.len(),
                "Client unregistered"
            ),
            None => debug!(conn_id = %connection_id, "Client already unregistered"),
        }
        removed
    }

    /// 查询客户端记录
    pub fn lookup(&self, connection_id: ConnectionId) -> Option<Arc<ClientRecord>> {
        self.clients
            .get(&connection_id)
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// 按连接标识排序的记录快照
    pub fn snapshot(&self) -> Vec<Arc<ClientRecord>> {
        let mut records: Vec<_> = self
            .clients
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.connection_id);
        records
    }

    /// 注册表使用的导出器
    pub fn exporter(&self) -> &Arc<dyn MetricExporter> {
        &self.exporter
    }
}
