//! # WSG Transport
//!
//! 数据报传输抽象层，提供统一的发送/接收接口。
//!
//! 真实实现为 [`UdpTransport`]；测试与仿真使用 `mock` feature 下的
//! [`mock::MockTransport`]。

use thiserror::Error;

pub mod udp;

pub use udp::UdpTransport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// 传输层统一错误类型
///
/// 传输层错误是会话级致命错误：套接字一旦报错，继续轮询没有意义，
/// 调用方应终止会话。
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Datagram truncated by send: sent {sent} of {expected} bytes")]
    SendFailed { sent: usize, expected: usize },

    #[error("Received datagram filled the {capacity}-byte buffer (truncation likely)")]
    OversizedDatagram { capacity: usize },
}

/// 数据报传输接口
///
/// 发送为"整报文或失败"；接收为非阻塞，队列为空时立即返回 `None`。
/// 套接字由请求应答通道独占持有，其他组件不得读写。
pub trait Transport {
    /// 发送一个完整数据报
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// 非阻塞接收：无数据报排队时返回 `None`
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}
