//! 请求/应答通道
//!
//! 在不可靠的数据报传输上实现"发一条指令、等它的终结应答"：
//! 轮询接收、丢弃无关应答与 `CmdPending` 中间应答、超时返回空。
//! 同时提供常用指令的高层封装。

use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};
use wsg_protocol::{
    CommandCode, CommandMessage, ReturnMessage, StatusCode, StatusUpdate, read_f32_le,
    read_u16_le, read_u32_le,
};
use wsg_transport::{Transport, TransportError};

use crate::config::CommandTimeouts;
use crate::error::CommandError;
use crate::state::GripperState;

/// 忙等轮询的节流间隔
///
/// 超时精度由循环开销决定，不依赖操作系统唤醒精度。
const POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Home 指令的标定方向（正方向为张开）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HomeDirection {
    Default = 0,
    Positive = 1,
    Negative = 2,
}

/// Preposition 遇阻行为
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PrepositionStopMode {
    /// 遇阻后以设定力限夹持
    ClampOnBlock = 0,
    /// 遇阻即停
    StopOnBlock = 1,
}

/// Preposition 定位方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PrepositionMoveMode {
    Absolute = 0,
    Relative = 2,
}

/// `GetSystemInfo` 应答
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemInfo {
    pub device_type: u8,
    pub hardware_revision: u8,
    pub firmware_version: u16,
    pub serial_number: u32,
}

/// `GetSystemLimits` 应答：设备物理包络
///
/// 标定期间查询一次，之后只读；所有下发的位置/力都要夹取到该包络内。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicalLimits {
    pub stroke_mm: f32,
    pub min_speed_mm_per_s: f32,
    pub max_speed_mm_per_s: f32,
    pub min_acc_mm_per_ss: f32,
    pub max_acc_mm_per_ss: f32,
    pub min_force: f32,
    pub nominal_force: f32,
    pub overdrive_force: f32,
}

/// WSG 请求/应答通道
///
/// 独占持有传输套接字；同一会话内不允许其他组件读写该套接字。
/// 单控制线程模型：[`send_and_await`](Wsg::send_and_await) 是唯一会
/// 阻塞的操作，阻塞上限由调用方超时决定，且无法被中途取消。
pub struct Wsg<T: Transport> {
    transport: T,
    timeouts: CommandTimeouts,
}

impl<T: Transport> Wsg<T> {
    /// 以默认超时档位创建通道
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeouts: CommandTimeouts::default(),
        }
    }

    /// 覆盖超时档位
    pub fn with_timeouts(mut self, timeouts: CommandTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// 只发不等（运动类指令常用：状态由周期推送异步跟踪）
    pub fn send(&mut self, msg: &CommandMessage) -> Result<(), TransportError> {
        self.transport.send(&msg.encode())
    }

    /// 发送指令并等待它的终结应答
    ///
    /// 轮询接收直到：
    /// - 收到指令码匹配且状态非 `CmdPending` 的应答 → 返回该应答；
    /// - 超时 → 返回 `None`（这不是错误，丢包环境下的正常结果）。
    ///
    /// 指令码不匹配的应答、`CmdPending` 中间应答、解码失败的数据报
    /// 一律丢弃并继续等待。长行程运动先回 `CmdPending` 再回终结状态
    /// 是正常流程。
    pub fn send_and_await(
        &mut self,
        msg: &CommandMessage,
        timeout: Duration,
    ) -> Result<Option<ReturnMessage>, TransportError> {
        self.transport.send(&msg.encode())?;
        let deadline = Instant::now() + timeout;

        loop {
            while let Some(datagram) = self.transport.try_receive()? {
                match ReturnMessage::decode(&datagram) {
                    Ok(ret) if ret.command() != msg.command() => {
                        trace!(
                            awaited = ?msg.command(),
                            received = ?ret.command(),
                            "discarding unrelated response"
                        );
                    }
                    Ok(ret) if ret.status().is_pending() => {
                        trace!(command = ?ret.command(), "command pending, awaiting final status");
                    }
                    Ok(ret) => {
                        if ret.status() != StatusCode::Success {
                            warn!(
                                command = ?ret.command(),
                                status = ?ret.status(),
                                "non-success response"
                            );
                        }
                        return Ok(Some(ret));
                    }
                    Err(e) => {
                        debug!(error = %e, "dropping malformed datagram");
                    }
                }
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }
            spin_sleep::sleep(POLL_INTERVAL);
        }
    }

    /// 阻塞执行：超时视为指令失败
    fn execute(
        &mut self,
        msg: &CommandMessage,
        timeout: Duration,
    ) -> Result<ReturnMessage, CommandError> {
        self.send_and_await(msg, timeout)?
            .ok_or(CommandError::Timeout {
                command: msg.command(),
                timeout,
            })
    }

    /// 阻塞执行并要求 `Success` 终结状态
    fn expect_success(
        &mut self,
        msg: &CommandMessage,
        timeout: Duration,
    ) -> Result<ReturnMessage, CommandError> {
        let ret = self.execute(msg, timeout)?;
        if ret.status() != StatusCode::Success {
            return Err(CommandError::Rejected {
                command: ret.command(),
                status: ret.status(),
            });
        }
        Ok(ret)
    }

    // ------------------------------------------------------------------
    // 指令封装
    // ------------------------------------------------------------------

    /// Home：移动到一侧极限并在该处标定行程（阻塞）
    pub fn home(&mut self, direction: HomeDirection) -> Result<(), CommandError> {
        let mut msg = CommandMessage::new(CommandCode::Home);
        msg.append_u8(direction as u8);
        self.expect_success(&msg, self.timeouts.home())?;
        Ok(())
    }

    /// 力传感器去皮（阻塞）
    ///
    /// `NotAvailable` 不视为失败：部分固件只有基于电流的内部力估计，
    /// 手册未明确它是否支持去皮。
    pub fn tare(&mut self) -> Result<(), CommandError> {
        let msg = CommandMessage::new(CommandCode::TareForceSensor);
        let ret = self.execute(&msg, self.timeouts.home())?;
        match ret.status() {
            StatusCode::Success | StatusCode::NotAvailable => Ok(()),
            status => Err(CommandError::Rejected {
                command: ret.command(),
                status,
            }),
        }
    }

    /// Grasp：以给定宽度与速度抓取（阻塞）
    pub fn grasp(&mut self, width_mm: f32, speed_mm_per_s: f32) -> Result<(), CommandError> {
        let mut msg = CommandMessage::new(CommandCode::Grasp);
        msg.append_f32(width_mm);
        msg.append_f32(speed_mm_per_s);
        self.expect_success(&msg, self.timeouts.motion())?;
        Ok(())
    }

    fn preposition_command(
        stop_mode: PrepositionStopMode,
        move_mode: PrepositionMoveMode,
        width_mm: f32,
        speed_mm_per_s: f32,
    ) -> CommandMessage {
        let mut msg = CommandMessage::new(CommandCode::PrePosition);
        msg.append_u8(stop_mode as u8 | move_mode as u8);
        msg.append_f32(width_mm);
        msg.append_f32(speed_mm_per_s);
        msg
    }

    /// Preposition：移动到目标宽度（阻塞）
    pub fn preposition(
        &mut self,
        stop_mode: PrepositionStopMode,
        move_mode: PrepositionMoveMode,
        width_mm: f32,
        speed_mm_per_s: f32,
    ) -> Result<(), CommandError> {
        let msg = Self::preposition_command(stop_mode, move_mode, width_mm, speed_mm_per_s);
        self.expect_success(&msg, self.timeouts.motion())?;
        Ok(())
    }

    /// Preposition：只发不等
    pub fn preposition_nonblocking(
        &mut self,
        stop_mode: PrepositionStopMode,
        move_mode: PrepositionMoveMode,
        width_mm: f32,
        speed_mm_per_s: f32,
    ) -> Result<(), TransportError> {
        let msg = Self::preposition_command(stop_mode, move_mode, width_mm, speed_mm_per_s);
        self.send(&msg)
    }

    /// Stop：只发不等
    pub fn stop(&mut self) -> Result<(), TransportError> {
        self.send(&CommandMessage::new(CommandCode::Stop))
    }

    /// 设置力限（阻塞）
    pub fn set_force_limit(&mut self, force: f32) -> Result<(), CommandError> {
        let mut msg = CommandMessage::new(CommandCode::SetForceLimit);
        msg.append_f32(force);
        self.expect_success(&msg, self.timeouts.query())?;
        Ok(())
    }

    /// 设置力限：只发不等
    pub fn set_force_limit_nonblocking(&mut self, force: f32) -> Result<(), TransportError> {
        let mut msg = CommandMessage::new(CommandCode::SetForceLimit);
        msg.append_f32(force);
        self.send(&msg)
    }

    /// 设置加速度（阻塞）
    pub fn set_acceleration(&mut self, acc_mm_per_ss: f32) -> Result<(), CommandError> {
        let mut msg = CommandMessage::new(CommandCode::SetAccel);
        msg.append_f32(acc_mm_per_ss);
        self.expect_success(&msg, self.timeouts.query())?;
        Ok(())
    }

    /// 清除软限位（阻塞）
    pub fn clear_soft_limits(&mut self) -> Result<(), CommandError> {
        let msg = CommandMessage::new(CommandCode::ClearSoftLimits);
        self.expect_success(&msg, self.timeouts.query())?;
        Ok(())
    }

    /// 开启某一查询指令的周期自动推送（阻塞，约等待一个推送周期）
    ///
    /// 所有 `Get*` 查询共用同一负载格式：`[always_send:1][period_ms:2]`。
    pub fn turn_on_updates(
        &mut self,
        command: CommandCode,
        period_ms: u16,
    ) -> Result<(), CommandError> {
        let mut msg = CommandMessage::new(command);
        msg.append_u8(1); // 1 = 持续自动推送
        msg.append_u16(period_ms);
        self.expect_success(&msg, self.timeouts.update_enable())?;
        Ok(())
    }

    /// 查询系统信息（阻塞；标定第一步的连通性探测）
    pub fn get_system_info(&mut self) -> Result<SystemInfo, CommandError> {
        let msg = CommandMessage::new(CommandCode::GetSystemInfo);
        let ret = self.expect_success(&msg, self.timeouts.query())?;
        let params = ret.params();
        let malformed = || CommandError::Malformed {
            command: CommandCode::GetSystemInfo,
            reason: "expected at least 8 bytes of system info",
        };
        Ok(SystemInfo {
            device_type: *params.first().ok_or_else(malformed)?,
            hardware_revision: *params.get(1).ok_or_else(malformed)?,
            firmware_version: read_u16_le(params, 2).ok_or_else(malformed)?,
            serial_number: read_u32_le(params, 4).ok_or_else(malformed)?,
        })
    }

    /// 查询物理包络（阻塞；8 个小端 f32，共 32 字节）
    pub fn get_physical_limits(&mut self) -> Result<PhysicalLimits, CommandError> {
        let msg = CommandMessage::new(CommandCode::GetSystemLimits);
        let ret = self.expect_success(&msg, self.timeouts.query())?;
        let params = ret.params();
        let malformed = || CommandError::Malformed {
            command: CommandCode::GetSystemLimits,
            reason: "expected 32 bytes of limit data",
        };
        Ok(PhysicalLimits {
            stroke_mm: read_f32_le(params, 0).ok_or_else(malformed)?,
            min_speed_mm_per_s: read_f32_le(params, 4).ok_or_else(malformed)?,
            max_speed_mm_per_s: read_f32_le(params, 8).ok_or_else(malformed)?,
            min_acc_mm_per_ss: read_f32_le(params, 12).ok_or_else(malformed)?,
            max_acc_mm_per_ss: read_f32_le(params, 16).ok_or_else(malformed)?,
            min_force: read_f32_le(params, 20).ok_or_else(malformed)?,
            nominal_force: read_f32_le(params, 24).ok_or_else(malformed)?,
            overdrive_force: read_f32_le(params, 28).ok_or_else(malformed)?,
        })
    }

    /// 排空接收队列，把遥测推送合入状态缓存
    ///
    /// 设计为每个调度节拍调用一次：一次性消化上个节拍以来积累的全部
    /// 遥测，队列空了立即返回，绝不阻塞。非 `Success` 推送与无关指令
    /// 静默丢弃（已接受的简化：遥测流没有错误上报通道）。
    ///
    /// 返回实际合入缓存的更新条数。
    pub fn drain(&mut self, state: &mut GripperState) -> Result<usize, TransportError> {
        let mut applied = 0;
        while let Some(datagram) = self.transport.try_receive()? {
            match ReturnMessage::decode(&datagram) {
                Ok(ret) => match StatusUpdate::from_return(&ret) {
                    Some(update) => {
                        state.apply(update);
                        applied += 1;
                    }
                    None => {
                        trace!(command = ?ret.command(), status = ?ret.status(), "discarding non-telemetry message");
                    }
                },
                Err(e) => {
                    debug!(error = %e, "dropping malformed datagram");
                }
            }
        }
        Ok(applied)
    }

    /// 底层传输的可变引用（诊断用逃生舱）
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
