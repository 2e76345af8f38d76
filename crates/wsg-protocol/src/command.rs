//! 指令码与指令消息构建
//!
//! 指令码取值来自 WSG Command Set Reference Manual，与设备固件一致，
//! 不得重新编号。

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::frame::encode_frame;

/// WSG 指令码
///
/// 覆盖固件指令集全集；驱动层只主动使用其中一部分，
/// 其余保留用于解析设备回显（例如抓包调试时的 `Loop`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CommandCode {
    Loop = 0x06,
    DisconnectAnnounce = 0x07,
    Home = 0x20,
    PrePosition = 0x21,
    Stop = 0x22,
    FastStop = 0x23,
    AcknowledgeStopOrFault = 0x24,
    Grasp = 0x25,
    Release = 0x26,
    SetAccel = 0x30,
    GetAccel = 0x31,
    SetForceLimit = 0x32,
    GetForceLimit = 0x33,
    SetSoftLimits = 0x34,
    GetSoftLimits = 0x35,
    ClearSoftLimits = 0x36,
    TareForceSensor = 0x38,
    GetSystemState = 0x40,
    GetGraspState = 0x41,
    GetGraspStats = 0x42,
    GetOpeningWidth = 0x43,
    GetSpeed = 0x44,
    GetForce = 0x45,
    GetTemperature = 0x46,
    GetSystemInfo = 0x50,
    SetDeviceTag = 0x51,
    GetDeviceTag = 0x52,
    GetSystemLimits = 0x53,
    GetFingerInfo = 0x60,
    GetFingerFlags = 0x61,
    FingerPowerControl = 0x62,
    GetFingerData = 0x63,
}

/// 待发送的指令消息
///
/// 负载按指令各自的参数顺序以小端追加构建，构建完成后只读。
/// 每条消息仅供一次发送使用，由调用方独占所有权。
///
/// # Example
///
/// ```
/// use wsg_protocol::{CommandCode, CommandMessage};
///
/// let mut msg = CommandMessage::new(CommandCode::PrePosition);
/// msg.append_u8(0); // 绝对定位 + 遇阻夹持
/// msg.append_f32(62.0);
/// msg.append_f32(50.0);
/// let frame = msg.encode();
/// assert_eq!(frame.len(), 9 + 8);
/// ```
#[derive(Debug, Clone)]
pub struct CommandMessage {
    command: CommandCode,
    payload: Vec<u8>,
}

impl CommandMessage {
    /// 创建空负载的指令消息
    pub fn new(command: CommandCode) -> Self {
        Self {
            command,
            payload: Vec::new(),
        }
    }

    /// 创建带初始负载的指令消息
    pub fn with_payload(command: CommandCode, payload: Vec<u8>) -> Self {
        Self { command, payload }
    }

    /// 指令码
    pub fn command(&self) -> CommandCode {
        self.command
    }

    /// 当前负载字节
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// 追加 1 字节参数
    pub fn append_u8(&mut self, value: u8) {
        self.payload.push(value);
    }

    /// 追加小端 u16 参数
    pub fn append_u16(&mut self, value: u16) {
        self.payload.extend_from_slice(&value.to_le_bytes());
    }

    /// 追加小端 u32 参数
    pub fn append_u32(&mut self, value: u32) {
        self.payload.extend_from_slice(&value.to_le_bytes());
    }

    /// 追加小端 f32 参数
    pub fn append_f32(&mut self, value: f32) {
        self.payload.extend_from_slice(&value.to_le_bytes());
    }

    /// 编码为完整的线上帧（同步头 + 指令 + 长度 + 负载 + CRC16）
    pub fn encode(&self) -> Vec<u8> {
        encode_frame(self.command.into(), &self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_code_values() {
        // 与固件手册逐项核对的抽样
        assert_eq!(u8::from(CommandCode::Home), 0x20);
        assert_eq!(u8::from(CommandCode::PrePosition), 0x21);
        assert_eq!(u8::from(CommandCode::Grasp), 0x25);
        assert_eq!(u8::from(CommandCode::SetForceLimit), 0x32);
        assert_eq!(u8::from(CommandCode::TareForceSensor), 0x38);
        assert_eq!(u8::from(CommandCode::GetSystemState), 0x40);
        assert_eq!(u8::from(CommandCode::GetSystemInfo), 0x50);
        assert_eq!(u8::from(CommandCode::GetSystemLimits), 0x53);
        assert_eq!(u8::from(CommandCode::GetFingerData), 0x63);
    }

    #[test]
    fn test_command_code_round_trip() {
        let code = CommandCode::try_from(0x43).unwrap();
        assert_eq!(code, CommandCode::GetOpeningWidth);
        assert!(CommandCode::try_from(0xFF).is_err());
    }

    #[test]
    fn test_payload_append_little_endian() {
        let mut msg = CommandMessage::new(CommandCode::Home);
        msg.append_u8(0xAB);
        msg.append_u16(0x1234);
        msg.append_u32(0xDEAD_BEEF);
        msg.append_f32(1.0);
        assert_eq!(
            msg.payload(),
            &[
                0xAB, // u8
                0x34, 0x12, // u16 LE
                0xEF, 0xBE, 0xAD, 0xDE, // u32 LE
                0x00, 0x00, 0x80, 0x3F, // 1.0f32 LE
            ]
        );
    }

    #[test]
    fn test_encode_frame_length() {
        let mut msg = CommandMessage::new(CommandCode::Grasp);
        msg.append_f32(62.0);
        msg.append_f32(200.0);
        // 帧长 = 负载长度 + 8（同步 3 + 指令 1 + 长度 2 + CRC 2）
        assert_eq!(msg.encode().len(), 8 + 8);
    }
}
