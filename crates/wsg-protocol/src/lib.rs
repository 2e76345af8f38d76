//! # WSG Protocol
//!
//! WSG 夹爪 UDP 二进制协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `command`: 指令码与指令消息构建
//! - `status`: 状态码、抓取状态与系统状态位域
//! - `frame`: 帧编码/解码与校验和验证
//! - `crc`: CRC16 校验和（设备固件约定，不可更改）
//! - `update`: 周期状态推送的类型化解析
//!
//! ## 字节序
//!
//! 同步头为固定的 `AA AA AA`，其余字段全部为小端字节序（Intel LSB first）。

pub mod command;
pub mod crc;
pub mod frame;
pub mod status;
pub mod update;

// 重新导出常用类型
pub use command::{CommandCode, CommandMessage};
pub use frame::{FrameError, ReturnMessage, encode_return};
pub use status::{GraspingState, StatusCode, SystemStateFlags};
pub use update::StatusUpdate;

/// 小端字节序读取工具函数
///
/// 协议中的多字节数值（长度、状态码、浮点参数）均为小端，
/// 这些函数用于从返回参数切片中按偏移读取。
///
/// 读取小端 u16，越界时返回 `None`
pub fn read_u16_le(bytes: &[u8], offset: usize) -> Option<u16> {
    let b = bytes.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

/// 读取小端 u32，越界时返回 `None`
pub fn read_u32_le(bytes: &[u8], offset: usize) -> Option<u32> {
    let b = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// 读取小端 f32，越界时返回 `None`
pub fn read_f32_le(bytes: &[u8], offset: usize) -> Option<f32> {
    read_u32_le(bytes, offset).map(f32::from_bits)
}
