// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use pushmon::collector::{ClientRegistry, CollectorListener};
use pushmon::infrastructure::metrics::{MetricExporter, PrometheusExporter, DEFAULT_BUCKETS};
use pushmon::protocol::DEFAULT_MAX_FRAME_BYTES;
use pushmon::utils::errors::CollectorError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// 运行在回环地址上的采集端
pub struct TestCollector {
    pub addr: SocketAddr,
    pub registry: ClientRegistry,
    pub exporter: Arc<dyn MetricExporter>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), CollectorError>>,
}

impl TestCollector {
    pub async fn start() -> Self {
        let exporter: Arc<dyn MetricExporter> =
            Arc::new(PrometheusExporter::new(&DEFAULT_BUCKETS).unwrap());
        let registry = ClientRegistry::new(exporter.clone());
        let listener = CollectorListener::listen(
            "127.0.0.1",
            0,
            5,
            registry.clone(),
            DEFAULT_MAX_FRAME_BYTES,
        )
        .await
        .unwrap();
        let addr = listener.local_addr().unwrap();

        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(listener.run_until(async {
            let _ = rx.await;
        }));

        Self {
            addr,
            registry,
            exporter,
            shutdown: Some(tx),
            task,
        }
    }

    /// 发送关闭信号并等待监听器退出
    pub async fn shutdown(mut self) -> Result<(), CollectorError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), &mut self.task)
            .await
            .expect("collector did not stop")
            .unwrap()
    }

    pub fn render(&self) -> String {
        self.exporter.render()
    }
}

/// 轮询直到条件成立，超时则失败
pub async fn wait_until<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// 轮询导出器输出直到包含给定行
pub async fn wait_for_line(collector: &TestCollector, line: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let output = collector.render();
        if output.lines().any(|l| l == line) {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {line:?} in:\n{output}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// 以原始TCP连接完成注册
pub async fn register_raw(addr: SocketAddr, name: &str, kind: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(format!("{{\"name\":\"{name}\",\"type\":\"{kind}\"}}\n").as_bytes())
        .await
        .unwrap();
    stream
}

/// 构造一帧线路文本
pub fn frame_line(agent: &str, sample: &str, value: f64, kind: &str) -> String {
    format!(
        "{{\"name\":\"{agent}\",\"timestamp\":\"2024-05-01 12:00:00\",\"data\":{{\"name\":\"{sample}\",\"value\":{value}}},\"type\":\"{kind}\"}}\n"
    )
}

pub async fn send_line(stream: &mut TcpStream, line: &str) {
    stream.write_all(line.as_bytes()).await.unwrap();
}
