// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{routing::get, Extension, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::collector::ClientRegistry;
use crate::infrastructure::metrics::MetricExporter;
use crate::presentation::handlers::metrics_handler;

/// 创建抓取端点路由
///
/// # 参数
///
/// * `exporter` - 采集端共享的导出器
/// * `registry` - 客户端注册表
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes(exporter: Arc<dyn MetricExporter>, registry: ClientRegistry) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler::metrics))
        .route("/health", get(metrics_handler::health))
        .route("/version", get(version))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(exporter))
        .layer(Extension(registry))
}

/// 在给定监听器上提供抓取端点，直到进程退出
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Scrape endpoint listening on {}", addr);
    }
    axum::serve(listener, app).await
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
