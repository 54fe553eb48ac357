// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, FramedRead, FramedWrite, LinesCodec, LinesCodecError};

use crate::domain::models::metric::{MetricFrame, RegistrationMessage};
use crate::utils::errors::ProtocolError;

/// 默认单帧最大字节数（不含换行符）
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024;

/// 按行分帧的读取端
pub type FrameReader<R> = FramedRead<R, FrameCodec>;

/// 按行分帧的写入端
pub type FrameWriter<W> = FramedWrite<W, FrameCodec>;

/// 解码出的一行
#[derive(Debug)]
pub enum WireLine {
    /// 完整的一帧文本
    Text(String),
    /// 超长帧，已丢弃至下一个换行符
    Oversize,
    /// 非UTF-8内容，已丢弃
    NotUtf8,
}

/// 换行分隔的JSON帧编解码器
///
/// 超长行和非UTF-8行作为单帧错误交给上层处理，不中断后续读取
#[derive(Debug, Clone)]
pub struct FrameCodec {
    lines: LinesCodec,
}

impl FrameCodec {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_frame_bytes),
        }
    }

    pub fn max_frame_bytes(&self) -> usize {
        self.lines.max_length()
    }

    fn map(
        result: Result<Option<String>, LinesCodecError>,
    ) -> Result<Option<WireLine>, ProtocolError> {
        match result {
            Ok(line) => Ok(line.map(WireLine::Text)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(WireLine::Oversize)),
            // LinesCodec consumes the line before validating UTF-8.
            Err(LinesCodecError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                Ok(Some(WireLine::NotUtf8))
            }
            Err(LinesCodecError::Io(e)) => Err(ProtocolError::Io(e)),
        }
    }
}

impl Decoder for FrameCodec {
    type Item = WireLine;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<WireLine>, ProtocolError> {
        Self::map(self.lines.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<WireLine>, ProtocolError> {
        Self::map(self.lines.decode_eof(src))
    }
}

impl Encoder<String> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if line.len() > self.lines.max_length() {
            return Err(ProtocolError::FrameTooLarge {
                max: self.lines.max_length(),
            });
        }
        self.lines.encode(line, dst).map_err(|e| match e {
            LinesCodecError::Io(io) => ProtocolError::Io(io),
            LinesCodecError::MaxLineLengthExceeded => ProtocolError::FrameTooLarge {
                max: self.lines.max_length(),
            },
        })
    }
}

/// 创建分帧读取端
pub fn frame_reader<R: AsyncRead>(inner: R, max_frame_bytes: usize) -> FrameReader<R> {
    FramedRead::new(inner, FrameCodec::new(max_frame_bytes))
}

/// 创建分帧写入端
pub fn frame_writer<W: AsyncWrite>(inner: W, max_frame_bytes: usize) -> FrameWriter<W> {
    FramedWrite::new(inner, FrameCodec::new(max_frame_bytes))
}

/// 读取下一帧
///
/// # 返回值
///
/// * `None` - 对端已干净关闭连接
/// * `Some(Ok(line))` - 一帧原始内容
/// * `Some(Err(FrameTooLarge | InvalidUtf8))` - 单帧错误，连接仍可继续读取
/// * `Some(Err(Io))` - 连接级错误
pub async fn next_frame<R>(reader: &mut FrameReader<R>) -> Option<Result<String, ProtocolError>>
where
    R: AsyncRead + Unpin,
{
    let max = reader.decoder().max_frame_bytes();
    reader.next().await.map(|result| match result? {
        WireLine::Text(line) => Ok(line),
        WireLine::Oversize => Err(ProtocolError::FrameTooLarge { max }),
        WireLine::NotUtf8 => Err(ProtocolError::InvalidUtf8),
    })
}

/// 序列化一条消息，写入并刷新
pub async fn write_message<W, T>(
    writer: &mut FrameWriter<W>,
    message: &T,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let line = serde_json::to_string(message)?;
    writer.send(line).await
}

/// 解码注册消息
pub fn decode_registration(line: &str) -> Result<RegistrationMessage, ProtocolError> {
    Ok(serde_json::from_str(line.trim())?)
}

/// 解码指标帧
pub fn decode_frame(line: &str) -> Result<MetricFrame, ProtocolError> {
    Ok(serde_json::from_str(line.trim())?)
}
