//! 会话配置
//!
//! 默认值对应设备出厂预配置：夹爪固定监听 192.168.1.20:1500，
//! 并把应答发回本地 1501 端口。

use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 阻塞式指令的超时档位
///
/// 查询类指令应答很快；Home/Tare 要等机械运动完成；
/// Grasp/Preposition 的行程可能更长。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTimeouts {
    /// 查询与参数设置类指令（毫秒）
    pub query_ms: u64,
    /// 周期更新开启确认（毫秒）
    pub update_enable_ms: u64,
    /// Home / Tare（毫秒）
    pub home_ms: u64,
    /// Grasp / 阻塞式 Preposition（毫秒）
    pub motion_ms: u64,
}

impl Default for CommandTimeouts {
    fn default() -> Self {
        Self {
            query_ms: 100,
            update_enable_ms: 250,
            home_ms: 4_000,
            motion_ms: 6_000,
        }
    }
}

impl CommandTimeouts {
    pub fn query(&self) -> Duration {
        Duration::from_millis(self.query_ms)
    }

    pub fn update_enable(&self) -> Duration {
        Duration::from_millis(self.update_enable_ms)
    }

    pub fn home(&self) -> Duration {
        Duration::from_millis(self.home_ms)
    }

    pub fn motion(&self) -> Duration {
        Duration::from_millis(self.motion_ms)
    }
}

/// 夹爪会话配置
///
/// # Example
///
/// ```
/// use wsg_driver::WsgConfig;
///
/// let config = WsgConfig::default();
/// assert_eq!(config.gripper_addr, "192.168.1.20");
/// assert_eq!(config.gripper_port, 1500);
/// let remote = config.gripper_endpoint().unwrap();
/// assert_eq!(remote.port(), 1500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsgConfig {
    /// 夹爪 IP 地址
    pub gripper_addr: String,
    /// 夹爪 UDP 端口
    pub gripper_port: u16,
    /// 本地绑定地址
    pub local_addr: String,
    /// 本地 UDP 端口
    pub local_port: u16,
    /// 周期状态推送间隔（毫秒，5-20 合理）
    pub update_period_ms: u16,
    /// 各类指令超时
    pub timeouts: CommandTimeouts,
}

impl Default for WsgConfig {
    fn default() -> Self {
        Self {
            gripper_addr: "192.168.1.20".to_string(),
            gripper_port: 1500,
            local_addr: "0.0.0.0".to_string(),
            local_port: 1501,
            update_period_ms: 5,
            timeouts: CommandTimeouts::default(),
        }
    }
}

impl WsgConfig {
    /// 夹爪端点
    pub fn gripper_endpoint(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.gripper_addr.parse()?;
        Ok(SocketAddr::new(ip, self.gripper_port))
    }

    /// 本地绑定端点
    pub fn local_endpoint(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.local_addr.parse()?;
        Ok(SocketAddr::new(ip, self.local_port))
    }
}
