// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::http::header;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::collector::ClientRegistry;
use crate::infrastructure::metrics::MetricExporter;

/// Prometheus文本格式的内容类型
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// 抓取端点
///
/// 渲染导出器中所有已注册指标族的当前值
pub async fn metrics(Extension(exporter): Extension<Arc<dyn MetricExporter>>) -> impl IntoResponse {
    let body = exporter.render();
    debug!(families = exporter.family_count(), "Metrics scraped");

    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body)
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回状态和当前已注册的客户端数量
pub async fn health(Extension(registry): Extension<ClientRegistry>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "clients": registry.len(),
    }))
}
