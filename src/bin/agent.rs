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

use pushmon::agent::{AgentConnection, AgentScheduler};
use pushmon::config::settings::Settings;
use pushmon::domain::models::metric::RegistrationMessage;
use pushmon::infrastructure::sources::build_source;
use pushmon::utils::telemetry;
use pushmon::workers::WorkerManager;
use tracing::info;

/// Agent入口
///
/// 按配置构建指标源并以固定间隔向采集端推送
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::new()?;
    telemetry::init_telemetry(settings.telemetry.json);

    let agent = &settings.agent;
    info!(agent = %agent.name, kind = %agent.kind, "Starting pushmon agent...");

    let source = build_source(agent.source, &agent.name);
    let connection = AgentConnection::new(
        RegistrationMessage::new(agent.name.clone(), agent.kind),
        settings.collector.host.clone(),
        settings.collector.port,
    )
    .with_reconnect_delay(agent.reconnect_delay())
    .with_max_frame_bytes(settings.collector.max_frame_bytes);

    let mut manager = WorkerManager::new();
    manager.spawn(Box::new(AgentScheduler::new(
        connection,
        source,
        agent.interval(),
    )));

    manager.wait_for_shutdown().await?;
    info!("Agent stopped");
    Ok(())
}
