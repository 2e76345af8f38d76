//! 帧编码/解码
//!
//! 线上格式（同步头固定，其余小端）：
//!
//! ```text
//! [0xAA][0xAA][0xAA][command:1][payload_len:2][payload:payload_len][crc16:2]
//! ```
//!
//! 入站帧的逻辑负载为 2 字节状态码 + 返回参数；CRC16 覆盖
//! `[0 .. 6 + payload_len)`，即同步头、指令、长度与负载。
//! 解码强制校验 CRC：UDP 自身的校验是可选的，而这是与执行器的唯一防线。

use thiserror::Error;

use crate::command::CommandCode;
use crate::crc::crc16;
use crate::status::StatusCode;

/// 同步头字节
pub const SYNC_BYTE: u8 = 0xAA;

/// 最短合法帧：同步 3 + 指令 1 + 长度 2 + 状态码 2 + CRC 2
pub const MIN_FRAME_LEN: usize = 10;

/// 帧解码错误
///
/// 全部为本地、非致命错误：丢弃该数据报即可，会话继续。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame too short: {len} bytes (minimum {MIN_FRAME_LEN})")]
    TooShort { len: usize },

    #[error("Bad sync marker: expected AA AA AA, got {found:02X?}")]
    BadSync { found: [u8; 3] },

    #[error("Inconsistent payload length: declared {declared}, buffer holds {actual}")]
    BadLength { declared: usize, actual: usize },

    #[error("Checksum mismatch: frame carries {found:#06X}, computed {computed:#06X}")]
    ChecksumMismatch { found: u16, computed: u16 },

    #[error("Unknown command code: {code:#04X}")]
    UnknownCommand { code: u8 },
}

/// 设备返回消息
///
/// 仅由成功解码的数据报构造；非法数据报永远不会产生 `ReturnMessage`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnMessage {
    command: CommandCode,
    status: StatusCode,
    params: Vec<u8>,
}

impl ReturnMessage {
    /// 所应答的指令码
    pub fn command(&self) -> CommandCode {
        self.command
    }

    /// 状态码
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// 状态码之后的返回参数
    pub fn params(&self) -> &[u8] {
        &self.params
    }

    /// 解码一个完整的入站数据报
    ///
    /// # 错误
    /// - `TooShort`: 不足 10 字节
    /// - `BadSync`: 前三字节不是 `AA AA AA`
    /// - `BadLength`: 声明长度小于 2（状态码必须存在）或与缓冲区实际长度不符
    /// - `ChecksumMismatch`: CRC16 校验失败
    /// - `UnknownCommand`: 指令码不在固件指令集内
    pub fn decode(bytes: &[u8]) -> Result<ReturnMessage, FrameError> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(FrameError::TooShort { len: bytes.len() });
        }
        if bytes[0] != SYNC_BYTE || bytes[1] != SYNC_BYTE || bytes[2] != SYNC_BYTE {
            return Err(FrameError::BadSync {
                found: [bytes[0], bytes[1], bytes[2]],
            });
        }

        let declared = u16::from_le_bytes([bytes[4], bytes[5]]) as usize;
        let actual = bytes.len() - 8;
        if declared < 2 || declared != actual {
            return Err(FrameError::BadLength { declared, actual });
        }

        let covered = 6 + declared;
        let computed = crc16(&bytes[..covered]);
        let found = u16::from_le_bytes([bytes[covered], bytes[covered + 1]]);
        if found != computed {
            return Err(FrameError::ChecksumMismatch { found, computed });
        }

        let command = CommandCode::try_from(bytes[3])
            .map_err(|_| FrameError::UnknownCommand { code: bytes[3] })?;
        let status = StatusCode::from(u16::from_le_bytes([bytes[6], bytes[7]]));
        let params = bytes[8..covered].to_vec();

        Ok(ReturnMessage {
            command,
            status,
            params,
        })
    }
}

/// 编码一个出站帧（指令 + 参数负载）
///
/// 始终成功；帧长 = 负载长度 + 8。
pub fn encode_frame(command: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 8);
    frame.extend_from_slice(&[SYNC_BYTE, SYNC_BYTE, SYNC_BYTE, command]);
    frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    frame.extend_from_slice(payload);
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    frame
}

/// 编码一个入站风格的帧（状态码前置于参数）
///
/// 设备固件才是该格式的真正生产者；SDK 内用于测试和设备仿真。
pub fn encode_return(command: CommandCode, status: StatusCode, params: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(params.len() + 2);
    payload.extend_from_slice(&u16::from(status).to_le_bytes());
    payload.extend_from_slice(params);
    encode_frame(command.into(), &payload)
}
