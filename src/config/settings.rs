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

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::collector::listener::DEFAULT_BACKLOG;
use crate::domain::models::metric::MetricKind;
use crate::infrastructure::metrics::DEFAULT_BUCKETS;
use crate::infrastructure::sources::SourceKind;
use crate::protocol::DEFAULT_MAX_FRAME_BYTES;

/// 应用程序配置设置
///
/// Agent和采集端共用同一份配置，各自读取需要的部分
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 采集端配置（Agent也从这里读取连接地址）
    pub collector: CollectorSettings,
    /// 抓取端点配置
    pub exporter: ExporterSettings,
    /// Agent配置
    pub agent: AgentSettings,
    /// 日志配置
    pub telemetry: TelemetrySettings,
}

/// 采集端配置设置
#[derive(Debug, Deserialize)]
pub struct CollectorSettings {
    /// 监听/连接主机地址
    pub host: String,
    /// 监听/连接端口
    pub port: u16,
    /// 监听队列长度
    pub backlog: u32,
    /// 单帧最大字节数
    pub max_frame_bytes: usize,
}

/// 抓取端点配置设置
#[derive(Debug, Deserialize)]
pub struct ExporterSettings {
    /// 抓取端点监听地址
    pub host: String,
    /// 抓取端点端口
    pub port: u16,
    /// 直方图分桶上界
    pub histogram_buckets: Vec<f64>,
}

/// Agent配置设置
#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    /// 显示名称（采集端的指标族名）
    pub name: String,
    /// 声明的指标类型
    pub kind: MetricKind,
    /// 指标源 (test, memory, system)
    pub source: SourceKind,
    /// 采样间隔（秒）
    pub interval_secs: u64,
    /// 重连间隔（秒）
    pub reconnect_delay_secs: u64,
}

impl AgentSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

/// 日志配置设置
#[derive(Debug, Deserialize)]
pub struct TelemetrySettings {
    /// 是否输出JSON格式日志
    pub json: bool,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加默认值、配置文件和环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    /// 带默认值和全部配置源的构建器
    pub fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let buckets: Vec<f64> = DEFAULT_BUCKETS.to_vec();

        let builder = Config::builder()
            // Collector settings
            .set_default("collector.host", "127.0.0.1")?
            .set_default("collector.port", 8686)?
            .set_default("collector.backlog", i64::from(DEFAULT_BACKLOG))?
            .set_default("collector.max_frame_bytes", DEFAULT_MAX_FRAME_BYTES as i64)?
            // Scrape endpoint settings
            .set_default("exporter.host", "0.0.0.0")?
            .set_default("exporter.port", 8000)?
            .set_default("exporter.histogram_buckets", buckets)?
            // Agent settings
            .set_default("agent.name", "test")?
            .set_default("agent.kind", "gauge")?
            .set_default("agent.source", "test")?
            .set_default("agent.interval_secs", 1)?
            .set_default("agent.reconnect_delay_secs", 5)?
            // Telemetry settings
            .set_default("telemetry.json", false)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("PUSHMON")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("exporter.histogram_buckets")
                    .try_parsing(true),
            );

        Ok(builder)
    }
}
