//! 无硬件测试用的 Mock 传输
//!
//! 入站数据报由测试脚本预先排队；出站数据报全部留存，供断言检查。

use std::collections::VecDeque;

use crate::{Transport, TransportError};

/// 脚本化的内存传输
///
/// 测试先用 [`queue_datagram`](MockTransport::queue_datagram) 排好设备
/// 应答，再驱动被测代码，最后用 [`take_sent`](MockTransport::take_sent)
/// 检查发出的帧。
#[derive(Debug, Default)]
pub struct MockTransport {
    inbound: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    fail_next_send: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 排队一个入站数据报（FIFO）
    pub fn queue_datagram(&mut self, datagram: Vec<u8>) {
        self.inbound.push_back(datagram);
    }

    /// 取走并清空已发送的数据报
    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.sent)
    }

    /// 已发送的数据报数量
    pub fn sent_count(&self) -> usize {
        self.sent.len()
    }

    /// 让下一次发送失败（模拟套接字故障）
    pub fn fail_next_send(&mut self) {
        self.fail_next_send = true;
    }
}

impl Transport for MockTransport {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if self.fail_next_send {
            self.fail_next_send = false;
            return Err(TransportError::SendFailed {
                sent: 0,
                expected: payload.len(),
            });
        }
        self.sent.push(payload.to_vec());
        Ok(())
    }

    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.inbound.pop_front())
    }
}
