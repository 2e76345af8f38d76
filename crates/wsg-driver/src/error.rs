//! 驱动层错误类型定义
//!
//! 错误分级与处理策略：
//! - 帧错误（`wsg_protocol::FrameError`）：本地、非致命，丢弃数据报即可，
//!   不会出现在本模块的错误类型中
//! - 传输错误：套接字级故障，会话级致命
//! - 指令超时：不是异常，阻塞式指令把它作为普通失败返回
//! - 标定错误：致命，会话不得进入稳态控制

use std::time::Duration;

use thiserror::Error;
use wsg_protocol::{CommandCode, StatusCode};
use wsg_transport::TransportError;

/// 阻塞式指令执行错误
#[derive(Error, Debug)]
pub enum CommandError {
    /// 传输层故障（致命）
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 超时未收到终结应答
    ///
    /// 这是丢包环境下的正常结果，调用方按"指令失败"处理。
    #[error("No response to {command:?} within {timeout:?}")]
    Timeout {
        command: CommandCode,
        timeout: Duration,
    },

    /// 设备以非成功状态终结应答
    #[error("Command {command:?} rejected with status {status:?}")]
    Rejected {
        command: CommandCode,
        status: StatusCode,
    },

    /// 应答负载与固件手册约定的布局不符
    #[error("Malformed response to {command:?}: {reason}")]
    Malformed {
        command: CommandCode,
        reason: &'static str,
    },
}

/// 标定错误（致命：必须中止启动）
#[derive(Error, Debug)]
#[error("Calibration step `{step}` failed: {source}")]
pub struct CalibrationError {
    /// 失败的标定步骤名
    pub step: &'static str,
    #[source]
    pub source: CommandError,
}

/// 驱动层统一错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    /// 在物理限位就绪之前调用了稳态控制
    #[error("Control requested before calibration completed")]
    NotCalibrated,
}
