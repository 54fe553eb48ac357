// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::future::Future;
use std::net::SocketAddr;
use tokio::net::{lookup_host, TcpListener, TcpSocket, TcpStream};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::collector::handler::{ClientHandler, HandlerSummary};
use crate::collector::registry::ClientRegistry;
use crate::domain::models::client::ConnectionId;
use crate::protocol::{decode_registration, frame_reader, next_frame};
use crate::utils::errors::CollectorError;

/// 默认监听队列长度
pub const DEFAULT_BACKLOG: u32 = 5;

/// 采集端监听器
///
/// 接受Agent连接，每个连接在独立任务中完成注册握手并运行处理器。
/// 处理器任务由`JoinSet`跟踪，关闭时统一取消并等待其注销。
pub struct CollectorListener {
    listener: TcpListener,
    registry: ClientRegistry,
    max_frame_bytes: usize,
    handlers: JoinSet<Option<HandlerSummary>>,
    cancel: CancellationToken,
}

impl CollectorListener {
    /// 绑定并开始监听
    ///
    /// # 参数
    ///
    /// * `host` - 监听地址
    /// * `port` - 监听端口
    /// * `backlog` - 监听队列长度
    /// * `registry` - 客户端注册表
    /// * `max_frame_bytes` - 单帧最大字节数
    pub async fn listen(
        host: &str,
        port: u16,
        backlog: u32,
        registry: ClientRegistry,
        max_frame_bytes: usize,
    ) -> Result<Self, CollectorError> {
        let addr = lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| CollectorError::Resolve(format!("{host}:{port}")))?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(backlog)?;

        info!(addr = %listener.local_addr()?, backlog, "Collector listening");

        Ok(Self {
            listener,
            registry,
            max_frame_bytes,
            handlers: JoinSet::new(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// 无限接受循环，正常情况下不会返回
    pub async fn accept_loop(self) -> Result<(), CollectorError> {
        self.run_until(std::future::pending()).await
    }

    /// 运行接受循环直到收到关闭信号
    ///
    /// 关闭时停止接受新连接，取消所有处理器并等待它们注销客户端
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), CollectorError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_connection(stream, peer),
                    Err(e) => error!(error = %e, "Failed to accept connection"),
                },
                Some(joined) = self.handlers.join_next(), if !self.handlers.is_empty() => {
                    log_join(joined);
                }
            }
        }

        info!(handlers = self.handlers.len(), "Collector shutting down");
        self.cancel.cancel();
        while let Some(joined) = self.handlers.join_next().await {
            log_join(joined);
        }
        info!("Collector stopped");
        Ok(())
    }

    fn spawn_connection(&mut self, stream: TcpStream, peer: SocketAddr) {
        info!(%peer, "Connection accepted");
        let registry = self.registry.clone();
        let cancel = self.cancel.clone();
        let max_frame_bytes = self.max_frame_bytes;

        self.handlers.spawn(async move {
            serve_connection(stream, peer, registry, max_frame_bytes, cancel).await
        });
    }
}

/// 完成一个连接的注册握手并运行处理器
///
/// 注册失败只关闭该连接
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: ClientRegistry,
    max_frame_bytes: usize,
    cancel: CancellationToken,
) -> Option<HandlerSummary> {
    let connection_id = ConnectionId::next();
    let mut reader = frame_reader(stream, max_frame_bytes);

    let first = tokio::select! {
        _ = cancel.cancelled() => return None,
        first = next_frame(&mut reader) => first,
    };

    let line = match first {
        Some(Ok(line)) => line,
        Some(Err(e)) => {
            error!(conn_id = %connection_id, %peer, error = %e, "Failed to read registration");
            return None;
        }
        None => {
            warn!(conn_id = %connection_id, %peer, "Connection closed before registration");
            return None;
        }
    };

    let message = match decode_registration(&line) {
        Ok(message) => message,
        Err(e) => {
            error!(
                conn_id = %connection_id,
                %peer,
                error = %e,
                payload = %line,
                "Invalid registration"
            );
            return None;
        }
    };
    info!(
        conn_id = %connection_id,
        %peer,
        client = %message.name,
        kind = %message.kind,
        "Received registration"
    );

    let record = match registry.register(connection_id, peer, &message) {
        Ok(record) => record,
        Err(e) => {
            error!(
                conn_id = %connection_id,
                %peer,
                client = %message.name,
                error = %e,
                "Registration rejected"
            );
            return None;
        }
    };

    Some(ClientHandler::new(record, registry, reader, cancel).run().await)
}

fn log_join(joined: Result<Option<HandlerSummary>, JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!(error = %e, "Connection handler panicked");
        } else {
            warn!(error = %e, "Connection handler cancelled");
        }
    }
}
