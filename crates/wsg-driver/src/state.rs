//! 夹爪状态缓存
//!
//! 周期遥测推送到达后由 [`Wsg::drain`](crate::Wsg::drain) 合入此缓存；
//! 各字段独立更新，整体是最近一次观测的拼合，不保证同一时刻采样。

use std::time::{SystemTime, UNIX_EPOCH};

use wsg_protocol::{GraspingState, StatusUpdate, SystemStateFlags};

/// 最近一次观测到的夹爪状态
#[derive(Debug, Clone, Copy, Default)]
pub struct GripperState {
    /// 系统状态标志字
    pub system_state: SystemStateFlags,
    /// 抓取状态机
    pub grasping_state: GraspingState,
    /// 开口宽度（毫米）
    pub position_mm: f32,
    /// 手指速度（毫米/秒，负值为闭合方向）
    pub speed_mm_per_s: f32,
    /// 抓取力（牛，固件上报恒为非负）
    pub force: f32,
    /// 最近一次更新的本地时间戳（微秒，Unix 纪元）
    pub last_update_us: u64,
}

/// 对外发布的状态快照
///
/// 与 [`GripperState`] 的区别：力被赋予符号（闭合运动时取负），
/// 便于上层直接当作指尖受力使用。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    pub position_mm: f32,
    pub speed_mm_per_s: f32,
    /// 带符号力：速度为负（闭合中）时翻转符号
    pub force: f32,
    pub timestamp_us: u64,
}

impl GripperState {
    /// 合入一条遥测更新并盖上本地时间戳
    pub fn apply(&mut self, update: StatusUpdate) {
        match update {
            StatusUpdate::SystemState(flags) => self.system_state = flags,
            StatusUpdate::GraspingState(gs) => self.grasping_state = gs,
            StatusUpdate::OpeningWidth(mm) => self.position_mm = mm,
            StatusUpdate::Speed(v) => self.speed_mm_per_s = v,
            StatusUpdate::Force(f) => self.force = f,
        }
        self.last_update_us = now_us();
    }

    /// 生成带符号力的快照
    pub fn snapshot(&self) -> StatusSnapshot {
        let force = if self.speed_mm_per_s < 0.0 {
            -self.force
        } else {
            self.force
        };
        StatusSnapshot {
            position_mm: self.position_mm,
            speed_mm_per_s: self.speed_mm_per_s,
            force,
            timestamp_us: self.last_update_us,
        }
    }
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
