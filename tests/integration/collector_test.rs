// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{frame_line, register_raw, send_line, wait_for_line, wait_until, TestCollector};
use pushmon::domain::models::metric::MetricKind;
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// 注册后注册表中出现对应记录
#[tokio::test]
async fn registration_creates_client_record() {
    let collector = TestCollector::start().await;
    let _stream = register_raw(collector.addr, "memory", "gauge").await;

    wait_until("registration", || collector.registry.len() == 1).await;

    let records = collector.registry.snapshot();
    assert_eq!(records[0].display_name, "memory");
    assert_eq!(records[0].kind, MetricKind::Gauge);
    assert_eq!(records[0].exporter.kind(), MetricKind::Gauge);
}

/// 一条gauge帧的值出现在抓取输出中
#[tokio::test]
async fn gauge_frame_is_exported() {
    let collector = TestCollector::start().await;
    let mut stream = register_raw(collector.addr, "memory", "gauge").await;

    send_line(&mut stream, &frame_line("memory", "memory", 42.5, "gauge")).await;

    wait_for_line(&collector, "memory 42.5").await;
}

/// 四种类型分别执行设置、累加和观测
#[tokio::test]
async fn each_kind_applies_its_operation() {
    let collector = TestCollector::start().await;

    let mut gauge = register_raw(collector.addr, "temp", "gauge").await;
    let mut counter = register_raw(collector.addr, "requests", "counter").await;
    let mut histogram = register_raw(collector.addr, "latency", "histogram").await;
    let mut summary = register_raw(collector.addr, "payload", "summary").await;
    wait_until("four registrations", || collector.registry.len() == 4).await;

    send_line(&mut gauge, &frame_line("temp", "temp", 3.0, "gauge")).await;
    send_line(&mut gauge, &frame_line("temp", "temp", 7.5, "gauge")).await;
    send_line(&mut counter, &frame_line("requests", "requests", 2.0, "counter")).await;
    send_line(&mut counter, &frame_line("requests", "requests", 3.0, "counter")).await;
    send_line(&mut histogram, &frame_line("latency", "latency", 0.3, "histogram")).await;
    send_line(&mut summary, &frame_line("payload", "payload", 128.0, "summary")).await;

    wait_for_line(&collector, "temp 7.5").await;
    wait_for_line(&collector, "requests 5").await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let mut histogram_seen = false;
    let mut summary_seen = false;
    while !(histogram_seen && summary_seen) {
        // Rendering drains distribution samples, so keep what each pass saw.
        let output = collector.render();
        histogram_seen |= output.contains("latency_bucket") && output.contains("latency_count 1");
        summary_seen |= output.contains("quantile=") && output.contains("payload_count 1");
        assert!(
            tokio::time::Instant::now() < deadline,
            "distributions missing:\n{output}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// 采样名与注册名不同时写入带标签的序列
#[tokio::test]
async fn sample_names_become_labelled_series() {
    let collector = TestCollector::start().await;
    let mut stream = register_raw(collector.addr, "system", "gauge").await;

    send_line(&mut stream, &frame_line("system", "cpu_percent", 12.5, "gauge")).await;
    send_line(&mut stream, &frame_line("system", "memory_percent", 61.0, "gauge")).await;

    wait_for_line(&collector, "system{metric=\"cpu_percent\"} 12.5").await;
    wait_for_line(&collector, "system{metric=\"memory_percent\"} 61").await;
}

/// 格式错误的帧被丢弃，连接继续可用
#[tokio::test]
async fn malformed_frames_do_not_close_connection() {
    let collector = TestCollector::start().await;
    let mut stream = register_raw(collector.addr, "memory", "gauge").await;

    send_line(&mut stream, "this is not json\n").await;
    send_line(&mut stream, "{\"name\":\"memory\",\"type\":\"gauge\"}\n").await;
    send_line(&mut stream, &frame_line("memory", "memory", 1.0, "counter")).await;
    send_line(&mut stream, &format!("{}\n", "x".repeat(4096))).await;
    send_line(&mut stream, &frame_line("memory", "memory", 9.5, "gauge")).await;

    wait_for_line(&collector, "memory 9.5").await;
    assert_eq!(collector.registry.len(), 1);
}

/// 无效的注册消息只关闭该连接
#[tokio::test]
async fn invalid_registration_closes_connection() {
    let collector = TestCollector::start().await;
    let mut stream = register_raw(collector.addr, "memory", "timer").await;

    let mut buf = [0u8; 16];
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("connection was not closed");
    assert!(matches!(read, Ok(0) | Err(_)));
    assert!(collector.registry.is_empty());

    let mut healthy = register_raw(collector.addr, "memory", "gauge").await;
    send_line(&mut healthy, &frame_line("memory", "memory", 3.25, "gauge")).await;
    wait_for_line(&collector, "memory 3.25").await;
}

/// 客户端干净断开后记录被注销
#[tokio::test]
async fn clean_disconnect_unregisters_client() {
    let collector = TestCollector::start().await;
    let stream = register_raw(collector.addr, "memory", "gauge").await;
    wait_until("registration", || collector.registry.len() == 1).await;

    drop(stream);

    wait_until("unregistration", || collector.registry.is_empty()).await;
}

/// 客户端重置连接后记录被注销
#[tokio::test]
async fn reset_connection_unregisters_client() {
    let collector = TestCollector::start().await;
    let stream = register_raw(collector.addr, "memory", "gauge").await;
    wait_until("registration", || collector.registry.len() == 1).await;

    #[allow(deprecated)]
    stream.set_linger(Some(Duration::ZERO)).unwrap();
    drop(stream);

    wait_until("unregistration", || collector.registry.is_empty()).await;
}

/// 断开的客户端不影响其他客户端
#[tokio::test]
async fn disconnect_leaves_other_clients_untouched() {
    let collector = TestCollector::start().await;
    let leaving = register_raw(collector.addr, "memory", "gauge").await;
    let mut staying = register_raw(collector.addr, "requests", "counter").await;
    wait_until("registrations", || collector.registry.len() == 2).await;

    drop(leaving);
    wait_until("one unregistration", || collector.registry.len() == 1).await;

    send_line(&mut staying, &frame_line("requests", "requests", 4.0, "counter")).await;
    wait_for_line(&collector, "requests 4").await;
    assert_eq!(collector.registry.snapshot()[0].display_name, "requests");
}

/// 关闭时所有处理器被取消，客户端全部注销
#[tokio::test]
async fn shutdown_unregisters_all_clients() {
    let collector = TestCollector::start().await;
    let _a = register_raw(collector.addr, "memory", "gauge").await;
    let _b = register_raw(collector.addr, "latency", "histogram").await;
    wait_until("registrations", || collector.registry.len() == 2).await;

    let registry = collector.registry.clone();
    collector.shutdown().await.unwrap();

    assert!(registry.is_empty());
}

/// 无关闭信号的接受循环持续服务新连接
#[tokio::test]
async fn accept_loop_serves_connections() {
    use pushmon::collector::{ClientRegistry, CollectorListener};
    use pushmon::infrastructure::metrics::{PrometheusExporter, DEFAULT_BUCKETS};
    use std::sync::Arc;

    let exporter = Arc::new(PrometheusExporter::new(&DEFAULT_BUCKETS).unwrap());
    let registry = ClientRegistry::new(exporter);
    let listener = CollectorListener::listen("127.0.0.1", 0, 5, registry.clone(), 1024)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(listener.accept_loop());

    let _first = register_raw(addr, "first", "gauge").await;
    let _second = register_raw(addr, "second", "counter").await;
    wait_until("registrations", || registry.len() == 2).await;

    task.abort();
}
