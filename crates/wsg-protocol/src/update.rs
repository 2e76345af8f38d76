//! 周期状态推送的类型化解析
//!
//! 设备在开启自动更新后会按固定周期推送五类遥测消息。这里把它们收敛为
//! 一个封闭的标签联合，上层对它做穷尽匹配，而不是在原始指令码上做
//! 带默认分支的开放式 switch。

use crate::frame::ReturnMessage;
use crate::status::{GraspingState, StatusCode, SystemStateFlags};
use crate::{CommandCode, read_f32_le, read_u32_le};

/// 一条已识别的遥测更新
///
/// 每个变体恰好对应状态缓存中的一个字段。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusUpdate {
    /// 系统状态标志字（`GetSystemState`）
    SystemState(SystemStateFlags),
    /// 抓取状态机（`GetGraspState`）
    GraspingState(GraspingState),
    /// 开口宽度，毫米（`GetOpeningWidth`）
    OpeningWidth(f32),
    /// 手指速度，毫米/秒（`GetSpeed`）
    Speed(f32),
    /// 抓取力，牛顿（`GetForce`）
    Force(f32),
}

impl StatusUpdate {
    /// 从返回消息解析遥测更新
    ///
    /// 返回 `None` 的情况（按约定静默丢弃，不向上层报错）：
    /// - 状态码不是 `Success`
    /// - 指令码不属于五类遥测推送
    /// - 参数长度不足（畸形推送）
    pub fn from_return(msg: &ReturnMessage) -> Option<StatusUpdate> {
        if msg.status() != StatusCode::Success {
            return None;
        }
        match msg.command() {
            CommandCode::GetSystemState => {
                let raw = read_u32_le(msg.params(), 0)?;
                Some(StatusUpdate::SystemState(SystemStateFlags::from(raw)))
            }
            CommandCode::GetGraspState => {
                let state = GraspingState::try_from(*msg.params().first()?).ok()?;
                Some(StatusUpdate::GraspingState(state))
            }
            CommandCode::GetOpeningWidth => {
                Some(StatusUpdate::OpeningWidth(read_f32_le(msg.params(), 0)?))
            }
            CommandCode::GetSpeed => Some(StatusUpdate::Speed(read_f32_le(msg.params(), 0)?)),
            CommandCode::GetForce => Some(StatusUpdate::Force(read_f32_le(msg.params(), 0)?)),
            _ => None,
        }
    }
}
