//! 位置/力稳态控制
//!
//! 上电标定一次，之后每个节拍消化遥测、按需重下发运动指令。
//! 重下发策略刻意保守：Preposition 会打断正在进行的夹持，
//! 所以只有力目标变化超过死区、或运动方向需要反转时才重发。

use tracing::{debug, info};
use wsg_protocol::CommandCode;
use wsg_transport::{Transport, TransportError};

use crate::channel::{
    HomeDirection, PhysicalLimits, PrepositionMoveMode, PrepositionStopMode, SystemInfo, Wsg,
};
use crate::error::{CalibrationError, CommandError, DriverError};
use crate::state::{GripperState, StatusSnapshot};

/// 力目标死区（牛）
///
/// 力变化小于该值时不重发指令，避免在夹持中反复打断自己。
pub const FORCE_DEADBAND_NEWTONS: f32 = 5.0;

/// 控制器生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPhase {
    /// 尚未标定
    Uninitialized,
    /// 标定进行中
    Calibrating,
    /// 标定完成，可接受稳态控制
    Ready,
}

/// 位置/力控制器
///
/// 持有请求/应答通道与状态缓存。典型用法：
/// 1. [`calibrate`](Self::calibrate) 一次；
/// 2. 每个节拍先 [`task`](Self::task) 消化遥测，
///    再按上层目标调用 [`set_position_and_force`](Self::set_position_and_force)。
pub struct PositionForceControl<T: Transport> {
    wsg: Wsg<T>,
    state: GripperState,
    phase: ControlPhase,
    system_info: SystemInfo,
    limits: PhysicalLimits,
    /// 最近一次实际下发的目标宽度（毫米）
    executing_target_position_mm: f32,
    /// 最近一次实际下发的力限（牛）
    executing_force: f32,
    update_period_ms: u16,
}

impl<T: Transport> PositionForceControl<T> {
    pub fn new(wsg: Wsg<T>, update_period_ms: u16) -> Self {
        Self {
            wsg,
            state: GripperState::default(),
            phase: ControlPhase::Uninitialized,
            system_info: SystemInfo::default(),
            limits: PhysicalLimits::default(),
            executing_target_position_mm: 0.0,
            executing_force: 0.0,
            update_period_ms,
        }
    }

    /// 上电标定
    ///
    /// 步骤固定：探测连通性 → 开启周期遥测 → 双向 Home 标定行程 →
    /// 力传感器去皮 → 读取物理包络 → 清软限位 → 加速度拉满。
    /// 任一步失败即中止，错误里带失败的步骤名。
    pub fn calibrate(&mut self) -> Result<(), CalibrationError> {
        self.phase = ControlPhase::Calibrating;

        let step = |step: &'static str| move |source: CommandError| CalibrationError { step, source };

        self.system_info = self.wsg.get_system_info().map_err(step("get_system_info"))?;
        info!(
            firmware = %format_args!("{:#06x}", self.system_info.firmware_version),
            serial = self.system_info.serial_number,
            "gripper reachable"
        );

        for command in [
            CommandCode::GetSystemState,
            CommandCode::GetGraspState,
            CommandCode::GetOpeningWidth,
            CommandCode::GetSpeed,
            CommandCode::GetForce,
        ] {
            self.wsg
                .turn_on_updates(command, self.update_period_ms)
                .map_err(step("enable_updates"))?;
        }

        // 先到全闭端建立参考，再到全开端确认行程
        self.wsg
            .home(HomeDirection::Negative)
            .map_err(step("home_negative"))?;
        self.wsg
            .home(HomeDirection::Positive)
            .map_err(step("home_positive"))?;

        self.wsg.tare().map_err(step("tare"))?;

        self.limits = self
            .wsg
            .get_physical_limits()
            .map_err(step("get_physical_limits"))?;
        info!(
            stroke_mm = self.limits.stroke_mm,
            overdrive_force = self.limits.overdrive_force,
            "physical limits received"
        );

        self.wsg
            .clear_soft_limits()
            .map_err(step("clear_soft_limits"))?;
        self.wsg
            .set_acceleration(self.limits.max_acc_mm_per_ss)
            .map_err(step("set_acceleration"))?;

        // Home 正方向结束时夹爪全开、不受力
        self.executing_target_position_mm = self.limits.stroke_mm;
        self.executing_force = 0.0;
        self.phase = ControlPhase::Ready;
        Ok(())
    }

    /// 稳态控制：设定目标宽度与力限
    ///
    /// 目标夹取到物理包络内。仅在需要时重发指令：
    /// - 力目标与正在执行的力限相差超过死区；
    /// - 当前运动方向与新目标所需方向相反。
    ///
    /// 重发时先下发力限、再下发 Preposition（遇阻夹持、绝对定位、
    /// 最大速度），两者都只发不等，结果由遥测异步确认。
    pub fn set_position_and_force(
        &mut self,
        position_mm: f32,
        force: f32,
    ) -> Result<(), DriverError> {
        if self.phase != ControlPhase::Ready {
            return Err(DriverError::NotCalibrated);
        }

        let target_mm = position_mm.clamp(0.0, self.limits.stroke_mm);
        let target_force = force.clamp(0.0, self.limits.overdrive_force);

        let observed_mm = self.state.position_mm;
        let executing_mm = self.executing_target_position_mm;

        let force_changed = (target_force - self.executing_force).abs() > FORCE_DEADBAND_NEWTONS;
        // 反向判据：观测位置落在新目标与旧目标之间，说明当前运动
        // 方向与新目标所需方向相反
        let direction_reversed = (target_mm > observed_mm && observed_mm > executing_mm)
            || (target_mm < observed_mm && observed_mm < executing_mm);

        if !(force_changed || direction_reversed) {
            return Ok(());
        }

        debug!(
            target_mm,
            target_force, force_changed, direction_reversed, "recommanding motion"
        );
        self.wsg
            .set_force_limit_nonblocking(target_force)
            .map_err(DriverError::Transport)?;
        self.wsg
            .preposition_nonblocking(
                PrepositionStopMode::ClampOnBlock,
                PrepositionMoveMode::Absolute,
                target_mm,
                self.limits.max_speed_mm_per_s,
            )
            .map_err(DriverError::Transport)?;

        self.executing_target_position_mm = target_mm;
        self.executing_force = target_force;
        Ok(())
    }

    /// 周期任务：排空接收队列，把遥测合入状态缓存
    ///
    /// 返回本次合入的更新条数。
    pub fn task(&mut self) -> Result<usize, TransportError> {
        self.wsg.drain(&mut self.state)
    }

    /// 当前生命周期阶段
    pub fn phase(&self) -> ControlPhase {
        self.phase
    }

    /// 标定时读到的系统信息
    pub fn system_info(&self) -> &SystemInfo {
        &self.system_info
    }

    /// 标定时读到的物理包络
    pub fn physical_limits(&self) -> &PhysicalLimits {
        &self.limits
    }

    /// 最近观测到的开口宽度（毫米）
    pub fn position_mm(&self) -> f32 {
        self.state.position_mm
    }

    /// 最近观测到的手指速度（毫米/秒）
    pub fn speed_mm_per_s(&self) -> f32 {
        self.state.speed_mm_per_s
    }

    /// 最近观测到的抓取力（牛，无符号；带符号力见 [`snapshot`](Self::snapshot)）
    pub fn force(&self) -> f32 {
        self.state.force
    }

    /// 最近一次观测状态的快照
    pub fn snapshot(&self) -> StatusSnapshot {
        self.state.snapshot()
    }

    /// 原始状态缓存
    pub fn state(&self) -> &GripperState {
        &self.state
    }

    /// 底层通道的可变引用（标定流程之外的手动指令用）
    pub fn wsg_mut(&mut self) -> &mut Wsg<T> {
        &mut self.wsg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsg_protocol::{StatusCode, StatusUpdate, encode_return};
    use wsg_transport::mock::MockTransport;

    use crate::config::CommandTimeouts;

    /// 夹爪物理包络的测试样本：行程 110mm，过载力 120N
    fn queue_calibration_script(mock: &mut MockTransport) {
        let mut info = vec![6u8, 2u8];
        info.extend_from_slice(&0x0205u16.to_le_bytes());
        info.extend_from_slice(&42u32.to_le_bytes());
        mock.queue_datagram(encode_return(
            CommandCode::GetSystemInfo,
            StatusCode::Success,
            &info,
        ));

        for command in [
            CommandCode::GetSystemState,
            CommandCode::GetGraspState,
            CommandCode::GetOpeningWidth,
            CommandCode::GetSpeed,
            CommandCode::GetForce,
        ] {
            mock.queue_datagram(encode_return(command, StatusCode::Success, &[]));
        }

        mock.queue_datagram(encode_return(CommandCode::Home, StatusCode::Success, &[]));
        mock.queue_datagram(encode_return(CommandCode::Home, StatusCode::Success, &[]));
        mock.queue_datagram(encode_return(
            CommandCode::TareForceSensor,
            StatusCode::Success,
            &[],
        ));

        let values: [f32; 8] = [110.0, 5.0, 420.0, 100.0, 5000.0, 5.0, 80.0, 120.0];
        let mut limits = Vec::new();
        for v in values {
            limits.extend_from_slice(&v.to_le_bytes());
        }
        mock.queue_datagram(encode_return(
            CommandCode::GetSystemLimits,
            StatusCode::Success,
            &limits,
        ));

        mock.queue_datagram(encode_return(
            CommandCode::ClearSoftLimits,
            StatusCode::Success,
            &[],
        ));
        mock.queue_datagram(encode_return(CommandCode::SetAccel, StatusCode::Success, &[]));
    }

    fn calibrated_control() -> PositionForceControl<MockTransport> {
        let mut mock = MockTransport::new();
        queue_calibration_script(&mut mock);
        let wsg = Wsg::new(mock).with_timeouts(CommandTimeouts {
            query_ms: 20,
            update_enable_ms: 20,
            home_ms: 20,
            motion_ms: 20,
        });
        let mut control = PositionForceControl::new(wsg, 5);
        control.calibrate().unwrap();
        // 标定期间的出站帧不参与后续断言
        control.wsg_mut().transport_mut().take_sent();
        control
    }

    fn set_observed_position(control: &mut PositionForceControl<MockTransport>, mm: f32) {
        control.state.apply(StatusUpdate::OpeningWidth(mm));
    }

    #[test]
    fn test_calibration_sequence_and_phase() {
        let mut mock = MockTransport::new();
        queue_calibration_script(&mut mock);
        let wsg = Wsg::new(mock).with_timeouts(CommandTimeouts {
            query_ms: 20,
            update_enable_ms: 20,
            home_ms: 20,
            motion_ms: 20,
        });
        let mut control = PositionForceControl::new(wsg, 5);
        assert_eq!(control.phase(), ControlPhase::Uninitialized);

        control.calibrate().unwrap();
        assert_eq!(control.phase(), ControlPhase::Ready);
        assert_eq!(control.system_info().serial_number, 42);
        assert_eq!(control.physical_limits().stroke_mm, 110.0);

        // 12 条出站指令，顺序固定
        let sent = control.wsg_mut().transport_mut().take_sent();
        let commands: Vec<u8> = sent.iter().map(|f| f[3]).collect();
        assert_eq!(
            commands,
            vec![
                u8::from(CommandCode::GetSystemInfo),
                u8::from(CommandCode::GetSystemState),
                u8::from(CommandCode::GetGraspState),
                u8::from(CommandCode::GetOpeningWidth),
                u8::from(CommandCode::GetSpeed),
                u8::from(CommandCode::GetForce),
                u8::from(CommandCode::Home),
                u8::from(CommandCode::Home),
                u8::from(CommandCode::TareForceSensor),
                u8::from(CommandCode::GetSystemLimits),
                u8::from(CommandCode::ClearSoftLimits),
                u8::from(CommandCode::SetAccel),
            ]
        );
        // 两次 Home 方向：先负后正
        assert_eq!(sent[6][6], HomeDirection::Negative as u8);
        assert_eq!(sent[7][6], HomeDirection::Positive as u8);
    }

    #[test]
    fn test_calibration_failure_names_step() {
        let mut mock = MockTransport::new();
        // 只排 GetSystemInfo 应答，第一条 Home 超时
        let mut info = vec![6u8, 2u8];
        info.extend_from_slice(&0x0205u16.to_le_bytes());
        info.extend_from_slice(&42u32.to_le_bytes());
        mock.queue_datagram(encode_return(
            CommandCode::GetSystemInfo,
            StatusCode::Success,
            &info,
        ));
        for command in [
            CommandCode::GetSystemState,
            CommandCode::GetGraspState,
            CommandCode::GetOpeningWidth,
            CommandCode::GetSpeed,
            CommandCode::GetForce,
        ] {
            mock.queue_datagram(encode_return(command, StatusCode::Success, &[]));
        }

        let wsg = Wsg::new(mock).with_timeouts(CommandTimeouts {
            query_ms: 20,
            update_enable_ms: 20,
            home_ms: 20,
            motion_ms: 20,
        });
        let mut control = PositionForceControl::new(wsg, 5);
        let err = control.calibrate().unwrap_err();
        assert_eq!(err.step, "home_negative");
        assert_eq!(control.phase(), ControlPhase::Calibrating);
    }

    #[test]
    fn test_tare_not_available_does_not_abort_calibration() {
        let mut mock = MockTransport::new();
        let mut info = vec![6u8, 2u8];
        info.extend_from_slice(&0x0205u16.to_le_bytes());
        info.extend_from_slice(&42u32.to_le_bytes());
        mock.queue_datagram(encode_return(
            CommandCode::GetSystemInfo,
            StatusCode::Success,
            &info,
        ));
        for command in [
            CommandCode::GetSystemState,
            CommandCode::GetGraspState,
            CommandCode::GetOpeningWidth,
            CommandCode::GetSpeed,
            CommandCode::GetForce,
        ] {
            mock.queue_datagram(encode_return(command, StatusCode::Success, &[]));
        }
        mock.queue_datagram(encode_return(CommandCode::Home, StatusCode::Success, &[]));
        mock.queue_datagram(encode_return(CommandCode::Home, StatusCode::Success, &[]));
        mock.queue_datagram(encode_return(
            CommandCode::TareForceSensor,
            StatusCode::NotAvailable,
            &[],
        ));
        let values: [f32; 8] = [110.0, 5.0, 420.0, 100.0, 5000.0, 5.0, 80.0, 120.0];
        let mut limits = Vec::new();
        for v in values {
            limits.extend_from_slice(&v.to_le_bytes());
        }
        mock.queue_datagram(encode_return(
            CommandCode::GetSystemLimits,
            StatusCode::Success,
            &limits,
        ));
        mock.queue_datagram(encode_return(
            CommandCode::ClearSoftLimits,
            StatusCode::Success,
            &[],
        ));
        mock.queue_datagram(encode_return(CommandCode::SetAccel, StatusCode::Success, &[]));

        let wsg = Wsg::new(mock).with_timeouts(CommandTimeouts {
            query_ms: 20,
            update_enable_ms: 20,
            home_ms: 20,
            motion_ms: 20,
        });
        let mut control = PositionForceControl::new(wsg, 5);
        assert!(control.calibrate().is_ok());
    }

    #[test]
    fn test_control_before_calibration_rejected() {
        let wsg = Wsg::new(MockTransport::new());
        let mut control = PositionForceControl::new(wsg, 5);
        let err = control.set_position_and_force(50.0, 20.0).unwrap_err();
        assert!(matches!(err, DriverError::NotCalibrated));
    }

    #[test]
    fn test_first_command_after_calibration_recommands() {
        let mut control = calibrated_control();
        // 标定后 executing = (110mm, 0N)；要求 20N 超出死区
        control.set_position_and_force(50.0, 20.0).unwrap();
        let sent = control.wsg_mut().transport_mut().take_sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0][3], u8::from(CommandCode::SetForceLimit));
        assert_eq!(sent[1][3], u8::from(CommandCode::PrePosition));
        assert_eq!(&sent[1][7..11], &50.0f32.to_le_bytes());
        // 速度取标定到的最大速度
        assert_eq!(&sent[1][11..15], &420.0f32.to_le_bytes());
    }

    #[test]
    fn test_force_deadband_suppresses_recommand() {
        let mut control = calibrated_control();
        control.set_position_and_force(50.0, 20.0).unwrap();
        control.wsg_mut().transport_mut().take_sent();

        // 力变化 4N < 死区 5N，位置同向：不重发
        control.set_position_and_force(50.0, 24.0).unwrap();
        assert_eq!(control.wsg_mut().transport_mut().sent_count(), 0);

        // 力变化 6N > 死区：重发
        control.set_position_and_force(50.0, 26.0).unwrap();
        assert_eq!(control.wsg_mut().transport_mut().sent_count(), 2);
    }

    #[test]
    fn test_direction_reversal_recommands() {
        let mut control = calibrated_control();
        // 朝 30mm 关闭，行进到 50mm 时改要 80mm：方向反转
        control.set_position_and_force(30.0, 20.0).unwrap();
        control.wsg_mut().transport_mut().take_sent();

        set_observed_position(&mut control, 50.0);
        control.set_position_and_force(80.0, 20.0).unwrap();
        let sent = control.wsg_mut().transport_mut().take_sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(&sent[1][7..11], &80.0f32.to_le_bytes());
    }

    #[test]
    fn test_closing_direction_reversal_recommands() {
        let mut control = calibrated_control();
        // 朝 80mm 张开，行进到 50mm 时改要 30mm：力不变也要重发
        control.set_position_and_force(80.0, 20.0).unwrap();
        control.wsg_mut().transport_mut().take_sent();

        set_observed_position(&mut control, 50.0);
        control.set_position_and_force(30.0, 20.0).unwrap();
        let sent = control.wsg_mut().transport_mut().take_sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(&sent[1][7..11], &30.0f32.to_le_bytes());
    }

    #[test]
    fn test_same_direction_extension_does_not_recommand() {
        let mut control = calibrated_control();
        control.set_position_and_force(30.0, 20.0).unwrap();
        control.wsg_mut().transport_mut().take_sent();

        // 行进到 50mm，新目标 10mm 还在同一方向：不打断
        set_observed_position(&mut control, 50.0);
        control.set_position_and_force(10.0, 20.0).unwrap();
        assert_eq!(control.wsg_mut().transport_mut().sent_count(), 0);
    }

    #[test]
    fn test_targets_clamped_to_physical_limits() {
        let mut control = calibrated_control();
        // 行程 110mm、过载力 120N；要求 (150mm, 200N) 被夹取
        control.set_position_and_force(150.0, 200.0).unwrap();
        let sent = control.wsg_mut().transport_mut().take_sent();
        assert_eq!(&sent[0][6..10], &120.0f32.to_le_bytes());
        assert_eq!(&sent[1][7..11], &110.0f32.to_le_bytes());
    }

    #[test]
    fn test_task_merges_telemetry() {
        let mut control = calibrated_control();
        control.wsg_mut().transport_mut().queue_datagram(encode_return(
            CommandCode::GetOpeningWidth,
            StatusCode::Success,
            &62.0f32.to_le_bytes(),
        ));
        control.wsg_mut().transport_mut().queue_datagram(encode_return(
            CommandCode::GetSpeed,
            StatusCode::Success,
            &(-8.0f32).to_le_bytes(),
        ));
        control.wsg_mut().transport_mut().queue_datagram(encode_return(
            CommandCode::GetForce,
            StatusCode::Success,
            &15.0f32.to_le_bytes(),
        ));
        assert_eq!(control.task().unwrap(), 3);

        let snapshot = control.snapshot();
        assert_eq!(snapshot.position_mm, 62.0);
        // 闭合中：力取负号
        assert_eq!(snapshot.force, -15.0);
    }

    #[test]
    fn test_telemetry_accessors() {
        let mut control = calibrated_control();
        control.wsg_mut().transport_mut().queue_datagram(encode_return(
            CommandCode::GetOpeningWidth,
            StatusCode::Success,
            &48.5f32.to_le_bytes(),
        ));
        control.wsg_mut().transport_mut().queue_datagram(encode_return(
            CommandCode::GetSpeed,
            StatusCode::Success,
            &(-6.0f32).to_le_bytes(),
        ));
        control.wsg_mut().transport_mut().queue_datagram(encode_return(
            CommandCode::GetForce,
            StatusCode::Success,
            &12.0f32.to_le_bytes(),
        ));
        control.task().unwrap();

        assert_eq!(control.position_mm(), 48.5);
        assert_eq!(control.speed_mm_per_s(), -6.0);
        // 访问器返回设备上报的无符号力原值
        assert_eq!(control.force(), 12.0);
        assert_eq!(control.snapshot().force, -12.0);
    }
}
