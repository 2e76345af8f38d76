//! WSG 夹爪驱动层
//!
//! 在 `wsg-protocol`（帧编解码）与 `wsg-transport`（数据报收发）之上
//! 提供三层能力：
//!
//! - [`Wsg`]：请求/应答通道，指令封装与遥测排空；
//! - [`GripperState`]：最近观测状态的缓存与快照；
//! - [`PositionForceControl`]：上电标定与位置/力稳态控制。
//!
//! 单控制线程模型：一个会话独占一个通道，所有调用都在同一线程上
//! 顺序执行。

pub mod channel;
pub mod config;
pub mod control;
pub mod error;
pub mod state;

pub use channel::{
    HomeDirection, PhysicalLimits, PrepositionMoveMode, PrepositionStopMode, SystemInfo, Wsg,
};
pub use config::{CommandTimeouts, WsgConfig};
pub use control::{ControlPhase, FORCE_DEADBAND_NEWTONS, PositionForceControl};
pub use error::{CalibrationError, CommandError, DriverError};
pub use state::{GripperState, StatusSnapshot};
