//! UDP 数据报传输实现
//!
//! 绑定一个本地端口，`connect` 到固定的夹爪端点。connect 之后内核会
//! 丢弃来自其他对端的数据报，等价于在用户态校验来源地址。

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use tracing::{debug, trace};

use crate::{Transport, TransportError};

/// 接收缓冲区大小
///
/// 必须显著大于任何真实应答（最长的 `GetSystemLimits` 应答不足 50 字节）。
/// 恰好填满缓冲区意味着数据报被截断，按错误处理。
pub const RECV_BUFFER_SIZE: usize = 1024;

/// 面向单一夹爪端点的 UDP 传输
pub struct UdpTransport {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl UdpTransport {
    /// 绑定本地端点并连接到夹爪端点
    ///
    /// # 错误
    /// - `TransportError::Io`: 绑定或连接失败（端口被占用、地址不可达等）
    pub fn bind(local: SocketAddr, remote: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local)?;
        socket.connect(remote)?;
        socket.set_nonblocking(true)?;
        debug!(local = %socket.local_addr()?, %remote, "UDP transport bound");
        Ok(Self { socket, remote })
    }

    /// 夹爪端点地址
    pub fn remote(&self) -> SocketAddr {
        self.remote
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let sent = self.socket.send(payload)?;
        if sent != payload.len() {
            return Err(TransportError::SendFailed {
                sent,
                expected: payload.len(),
            });
        }
        trace!(bytes = sent, "datagram sent");
        Ok(())
    }

    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        match self.socket.recv(&mut buffer) {
            Ok(n) if n == buffer.len() => Err(TransportError::OversizedDatagram {
                capacity: RECV_BUFFER_SIZE,
            }),
            Ok(n) => {
                trace!(bytes = n, "datagram received");
                Ok(Some(buffer[..n].to_vec()))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(TransportError::Io(e)),
        }
    }
}
