// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use pushmon::collector::{ClientRegistry, CollectorListener};
use pushmon::config::settings::Settings;
use pushmon::infrastructure::metrics::{MetricExporter, PrometheusExporter};
use pushmon::presentation::routes;
use pushmon::utils::telemetry;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 导出器维护间隔
const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// 采集端入口
///
/// 启动抓取端点和Agent监听器，收到关闭信号后注销所有客户端并退出
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let settings = Settings::new()?;

    // 2. Initialize logging
    telemetry::init_telemetry(settings.telemetry.json);
    info!("Starting pushmon collector...");

    // 3. Exporter and client registry
    let exporter: Arc<dyn MetricExporter> =
        Arc::new(PrometheusExporter::new(&settings.exporter.histogram_buckets)?);
    let registry = ClientRegistry::new(exporter.clone());

    // Drain distribution samples even when nobody scrapes
    let upkeep_exporter = exporter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPKEEP_INTERVAL);
        loop {
            interval.tick().await;
            upkeep_exporter.run_upkeep();
        }
    });

    // 4. Scrape endpoint
    let app = routes::routes(exporter, registry.clone());
    let scrape_listener =
        TcpListener::bind((settings.exporter.host.as_str(), settings.exporter.port)).await?;
    tokio::spawn(async move {
        if let Err(e) = routes::serve(scrape_listener, app).await {
            error!(error = %e, "Scrape endpoint stopped");
        }
    });

    // 5. Agent listener
    let listener = CollectorListener::listen(
        &settings.collector.host,
        settings.collector.port,
        settings.collector.backlog,
        registry,
        settings.collector.max_frame_bytes,
    )
    .await?;

    listener
        .run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received"),
                Err(err) => error!("Unable to listen for shutdown signal: {}", err),
            }
        })
        .await?;

    Ok(())
}
