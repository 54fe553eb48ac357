// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 线路协议模块
///
/// Agent与采集端共用的分帧与消息编解码
pub mod codec;

pub use codec::{
    decode_frame, decode_registration, frame_reader, frame_writer, next_frame, write_message,
    FrameReader, FrameWriter, DEFAULT_MAX_FRAME_BYTES,
};
