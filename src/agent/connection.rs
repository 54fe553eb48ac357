// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::io::{Error, ErrorKind};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::domain::models::metric::{MetricFrame, RegistrationMessage};
use crate::protocol::{frame_writer, write_message, FrameWriter, DEFAULT_MAX_FRAME_BYTES};
use crate::utils::errors::{is_connection_lost, AgentError, ProtocolError};

/// 到采集端的传输连接器
#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: AsyncWrite + Unpin + Send;

    /// 建立一条新连接
    async fn connect(&self, host: &str, port: u16) -> std::io::Result<Self::Stream>;
}

/// TCP连接器
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> std::io::Result<TcpStream> {
        TcpStream::connect((host, port)).await
    }
}

/// 默认重连间隔
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Agent连接管理器
///
/// 持有到采集端的单个TCP连接：无限重试连接、每次连接后发送注册消息、
/// 发送失败时重连并重发一次
pub struct AgentConnection<C: Connector = TcpConnector> {
    registration: RegistrationMessage,
    host: String,
    port: u16,
    connector: C,
    reconnect_delay: Duration,
    max_frame_bytes: usize,
    writer: Option<FrameWriter<C::Stream>>,
    connects: u64,
}

impl AgentConnection<TcpConnector> {
    /// 创建TCP连接管理器（不立即连接）
    ///
    /// # 参数
    ///
    /// * `registration` - 每次连接后发送的注册消息
    /// * `host` - 采集端地址
    /// * `port` - 采集端端口
    pub fn new(registration: RegistrationMessage, host: impl Into<String>, port: u16) -> Self {
        Self::with_connector(registration, host, port, TcpConnector)
    }
}

impl<C: Connector> AgentConnection<C> {
    /// 使用指定连接器创建连接管理器
    pub fn with_connector(
        registration: RegistrationMessage,
        host: impl Into<String>,
        port: u16,
        connector: C,
    ) -> Self {
        Self {
            registration,
            host: host.into(),
            port,
            connector,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            writer: None,
            connects: 0,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Agent显示名称
    pub fn agent(&self) -> &str {
        &self.registration.name
    }

    pub fn registration(&self) -> &RegistrationMessage {
        &self.registration
    }

    pub fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    /// 成功建立（并完成注册）的连接次数
    pub fn connect_count(&self) -> u64 {
        self.connects
    }

    /// 连接采集端
    ///
    /// 以固定间隔无限重试，直到TCP连接建立且注册消息发送成功
    pub async fn connect(&mut self) {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            info!(
                agent = %self.registration.name,
                host = %self.host,
                port = self.port,
                attempt,
                "Connecting to collector"
            );

            match self.connector.connect(&self.host, self.port).await {
                Ok(stream) => {
                    self.writer = Some(frame_writer(stream, self.max_frame_bytes));
                    match self.send_registration().await {
                        Ok(()) => {
                            self.connects += 1;
                            info!(
                                agent = %self.registration.name,
                                kind = %self.registration.kind,
                                "Connected and registered"
                            );
                            return;
                        }
                        Err(e) => {
                            self.writer = None;
                            warn!(
                                agent = %self.registration.name,
                                error = %e,
                                "Registration failed, reconnecting"
                            );
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        agent = %self.registration.name,
                        error = %e,
                        "Connection failed, trying again in {}s",
                        self.reconnect_delay.as_secs_f64()
                    );
                }
            }

            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// 发送注册消息
    pub async fn send_registration(&mut self) -> Result<(), AgentError> {
        let registration = self.registration.clone();
        self.write(&registration).await?;
        debug!(agent = %self.registration.name, "Registration sent");
        Ok(())
    }

    /// 发送指标帧
    ///
    /// 因连接断开导致的写入失败会触发一次重连并重发同一帧；再次失败则返回`SendFailed`。
    /// 超长帧等单帧错误以`Protocol`返回，连接保持不变
    pub async fn send_frame(&mut self, frame: &MetricFrame) -> Result<(), AgentError> {
        match self.write(frame).await {
            Ok(()) => Ok(()),
            Err(ProtocolError::Io(e)) if is_connection_lost(&e) => {
                warn!(agent = %self.registration.name, error = %e, "Connection lost, reconnecting");
                self.writer = None;
                self.connect().await;

                self.write(frame).await.map_err(|e| {
                    self.writer = None;
                    AgentError::SendFailed(e)
                })?;
                info!(agent = %self.registration.name, "Frame retransmitted after reconnect");
                Ok(())
            }
            Err(e) => Err(AgentError::Protocol(e)),
        }
    }

    async fn write<T: serde::Serialize>(&mut self, message: &T) -> Result<(), ProtocolError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ProtocolError::Io(Error::from(ErrorKind::NotConnected)))?;
        write_message(writer, message).await
    }
}
