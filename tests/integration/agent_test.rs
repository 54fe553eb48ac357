// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{wait_for_line, wait_until, TestCollector};
use pushmon::agent::{AgentConnection, AgentScheduler};
use pushmon::domain::models::metric::{MetricFrame, MetricKind, RegistrationMessage};
use pushmon::domain::sources::{MetricSource, Sample};
use pushmon::infrastructure::sources::TestSource;
use pushmon::protocol::{
    decode_frame, decode_registration, frame_reader, next_frame, DEFAULT_MAX_FRAME_BYTES,
};
use pushmon::utils::errors::SourceError;
use pushmon::workers::WorkerManager;
use std::time::Duration;
use tokio::net::TcpListener;

fn connection(collector_port: u16, name: &str, kind: MetricKind) -> AgentConnection {
    AgentConnection::new(RegistrationMessage::new(name, kind), "127.0.0.1", collector_port)
        .with_reconnect_delay(Duration::from_millis(50))
}

struct FailingSource;

impl MetricSource for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    fn sample(&mut self) -> Result<Sample, SourceError> {
        Err(SourceError::Unavailable("sensor offline".to_string()))
    }
}

struct FixedSource(Sample);

impl MetricSource for FixedSource {
    fn name(&self) -> &str {
        "fixed"
    }

    fn sample(&mut self) -> Result<Sample, SourceError> {
        Ok(self.0.clone())
    }
}

/// Agent连接后自动注册
#[tokio::test]
async fn agent_registers_on_connect() {
    let collector = TestCollector::start().await;
    let mut agent = connection(collector.addr.port(), "memory", MetricKind::Gauge);

    agent.connect().await;

    assert!(agent.is_connected());
    assert_eq!(agent.connect_count(), 1);
    wait_until("registration", || collector.registry.len() == 1).await;
    assert_eq!(collector.registry.snapshot()[0].display_name, "memory");
}

/// 一个调度周期的采样值出现在抓取输出中
#[tokio::test]
async fn scheduler_tick_reaches_exporter() {
    let collector = TestCollector::start().await;
    let mut agent = connection(collector.addr.port(), "test", MetricKind::Gauge);
    agent.connect().await;

    let mut scheduler = AgentScheduler::new(
        agent,
        Box::new(TestSource::with_values("test", 42.5, 1.0)),
        Duration::from_secs(1),
    );

    assert_eq!(scheduler.tick().await.unwrap(), 1);
    wait_for_line(&collector, "test 42.5").await;

    assert_eq!(scheduler.tick().await.unwrap(), 1);
    wait_for_line(&collector, "test 43.5").await;
}

/// 采样失败时本周期不发送任何帧
#[tokio::test]
async fn failed_sample_sends_nothing() {
    let collector = TestCollector::start().await;
    let mut agent = connection(collector.addr.port(), "sensor", MetricKind::Gauge);
    agent.connect().await;

    let mut scheduler = AgentScheduler::new(agent, Box::new(FailingSource), Duration::from_secs(1));

    assert_eq!(scheduler.tick().await.unwrap(), 0);
    assert!(scheduler.connection().is_connected());
}

/// 采集端晚于Agent启动时，Agent持续重试直到连接成功
#[tokio::test]
async fn agent_retries_until_collector_is_up() {
    let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);

    let agent_task = tokio::spawn(async move {
        let mut agent = connection(port, "late", MetricKind::Counter);
        agent.connect().await;
        agent.connect_count()
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    let (stream, _) = listener.accept().await.unwrap();

    let mut reader = frame_reader(stream, DEFAULT_MAX_FRAME_BYTES);
    let line = next_frame(&mut reader).await.unwrap().unwrap();
    assert_eq!(
        decode_registration(&line).unwrap(),
        RegistrationMessage::new("late", MetricKind::Counter)
    );
    assert_eq!(agent_task.await.unwrap(), 1);
}

/// 连接被重置后，Agent重连、重新注册并只重发一次失败的帧
#[tokio::test]
async fn agent_reconnects_and_retransmits_once() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut agent = connection(port, "memory", MetricKind::Gauge);
    let ((), accepted) = tokio::join!(agent.connect(), listener.accept());
    let (first, _) = accepted.unwrap();

    let mut first_reader = frame_reader(first, DEFAULT_MAX_FRAME_BYTES);
    next_frame(&mut first_reader).await.unwrap().unwrap();

    // Abortive close so the agent's next write fails.
    let first = first_reader.into_inner();
    #[allow(deprecated)]
    first.set_linger(Some(Duration::ZERO)).unwrap();
    drop(first);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let frame = MetricFrame::now("memory", "memory", 17.25, MetricKind::Gauge);
    let (sent, accepted) = tokio::join!(agent.send_frame(&frame), listener.accept());
    sent.unwrap();
    let (second, _) = accepted.unwrap();

    let mut reader = frame_reader(second, DEFAULT_MAX_FRAME_BYTES);
    let registration = next_frame(&mut reader).await.unwrap().unwrap();
    assert_eq!(
        decode_registration(&registration).unwrap(),
        RegistrationMessage::new("memory", MetricKind::Gauge)
    );
    let retransmitted = decode_frame(&next_frame(&mut reader).await.unwrap().unwrap()).unwrap();
    assert_eq!(retransmitted.data.value, 17.25);
    assert_eq!(agent.connect_count(), 2);

    drop(agent);
    assert!(next_frame(&mut reader).await.is_none());
}

/// 调度器作为工作器持续推送
#[tokio::test]
async fn scheduler_worker_streams_to_collector() {
    let collector = TestCollector::start().await;
    let agent = connection(collector.addr.port(), "test", MetricKind::Counter);

    let mut manager = WorkerManager::new();
    manager.spawn(Box::new(AgentScheduler::new(
        agent,
        Box::new(TestSource::with_values("test", 1.0, 0.0)),
        Duration::from_millis(20),
    )));

    wait_until("registration", || collector.registry.len() == 1).await;
    wait_until("several ticks", || {
        collector
            .render()
            .lines()
            .filter_map(|line| line.strip_prefix("test "))
            .any(|value| value.parse::<u64>().map(|v| v >= 3).unwrap_or(false))
    })
    .await;
}

/// 超长帧被跳过，其余采样值照常发送，连接不中断
#[tokio::test]
async fn oversize_frame_is_skipped() {
    let collector = TestCollector::start().await;
    let mut agent =
        connection(collector.addr.port(), "big", MetricKind::Gauge).with_max_frame_bytes(200);
    agent.connect().await;

    let source = FixedSource(Sample::from([
        ("a".repeat(300), 1.0),
        ("ok".to_string(), 2.5),
    ]));
    let mut scheduler = AgentScheduler::new(agent, Box::new(source), Duration::from_secs(1));

    assert_eq!(scheduler.tick().await.unwrap(), 1);
    assert!(scheduler.connection().is_connected());
    assert_eq!(scheduler.connection().connect_count(), 1);
    wait_for_line(&collector, "big{metric=\"ok\"} 2.5").await;
}
