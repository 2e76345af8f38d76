//! 状态码、抓取状态与系统状态位域
//!
//! 取值全部来自 WSG Command Set Reference Manual 的 `E_*` / `SF_*` 定义，
//! 与设备固件一致。

use bilge::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};

/// 返回消息状态码
///
/// `CmdPending` 是唯一的非终结状态：设备已接受指令，稍后会再发一条
/// 终结状态。其余取值均为终结状态（成功或失败）。
///
/// 固件新版本可能引入未列出的状态码，解析时通过 `Unknown` 原样保留，
/// 不会丢失原始数值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum StatusCode {
    Success = 0,
    NotAvailable = 1,
    NoSensor = 2,
    NotInitialized = 3,
    AlreadyRunning = 4,
    FeatureNotSupported = 5,
    InconsistentData = 6,
    Timeout = 7,
    ReadError = 8,
    WriteError = 9,
    InsufficientResources = 10,
    ChecksumError = 11,
    NoParamExpected = 12,
    NotEnoughParams = 13,
    CmdUnknown = 14,
    CmdFormatError = 15,
    AccessDenied = 16,
    AlreadyOpen = 17,
    CmdFailed = 18,
    CmdAborted = 19,
    InvalidHandle = 20,
    NotFound = 21,
    NotOpen = 22,
    IoError = 23,
    InvalidParameter = 24,
    IndexOutOfBounds = 25,
    CmdPending = 26,
    Overrun = 27,
    RangeError = 28,
    AxisBlocked = 29,
    FileExists = 30,
    #[num_enum(catch_all)]
    Unknown(u16),
}

impl StatusCode {
    /// 是否为非终结的"执行中"状态
    pub fn is_pending(self) -> bool {
        self == StatusCode::CmdPending
    }
}

/// 抓取状态机取值（`GetGraspState` 推送的首字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum GraspingState {
    #[default]
    Idle = 0,
    Grasping = 1,
    NoPartFound = 2,
    PartLost = 3,
    Holding = 4,
    Releasing = 5,
    Positioning = 6,
    Error = 7,
}

/// 系统状态标志字（`GetSystemState` 推送的 32 位位域）
///
/// 位序为 LSB first，与固件 `SF_*` 定义一致：
/// - Bit 0: 已参考（完成 Home 标定）
/// - Bit 1: 轴运动中
/// - Bit 2/3: 负/正方向遇阻
/// - Bit 4/5: 负/正方向软限位触发
/// - Bit 6: 轴已停止
/// - Bit 7: 到达目标位置
/// - Bit 9: 力控模式
/// - Bit 12: 急停
/// - Bit 13-17: 温度/供电/电流/手指故障
/// - Bit 18: 指令执行失败
/// - Bit 19/20: 脚本运行/脚本故障
#[bitsize(32)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq)]
pub struct SystemStateFlags {
    pub referenced: bool,        // Bit 0: SF_REFERENCED
    pub moving: bool,            // Bit 1: SF_MOVING
    pub blocked_minus: bool,     // Bit 2: SF_BLOCKED_MINUS
    pub blocked_plus: bool,      // Bit 3: SF_BLOCKED_PLUS
    pub soft_limit_minus: bool,  // Bit 4: SF_SOFT_LIMIT_MINUS
    pub soft_limit_plus: bool,   // Bit 5: SF_SOFT_LIMIT_PLUS
    pub axis_stopped: bool,      // Bit 6: SF_AXIS_STOPPED
    pub target_pos_reached: bool, // Bit 7: SF_TARGET_POS_REACHED
    pub reserved: u1,            // Bit 8: 保留
    pub force_control_mode: bool, // Bit 9: SF_FORCECNTL_MODE
    pub reserved: u2,            // Bit 10-11: 保留
    pub fast_stop: bool,         // Bit 12: SF_FAST_STOP
    pub temp_warning: bool,      // Bit 13: SF_TEMP_WARNING
    pub temp_fault: bool,        // Bit 14: SF_TEMP_FAULT
    pub power_fault: bool,       // Bit 15: SF_POWER_FAULT
    pub curr_fault: bool,        // Bit 16: SF_CURR_FAULT
    pub finger_fault: bool,      // Bit 17: SF_FINGER_FAULT
    pub cmd_failure: bool,       // Bit 18: SF_CMD_FAILURE
    pub script_running: bool,    // Bit 19: SF_SCRIPT_RUNNING
    pub script_failure: bool,    // Bit 20: SF_SCRIPT_FAILURE
    pub reserved: u11,           // Bit 21-31: 保留
}

impl SystemStateFlags {
    /// 任意故障位被置位
    pub fn any_fault(&self) -> bool {
        self.temp_fault()
            || self.power_fault()
            || self.curr_fault()
            || self.finger_fault()
            || self.cmd_failure()
            || self.script_failure()
    }
}
