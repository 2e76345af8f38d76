//! # WSG CLI
//!
//! 夹爪调试与上电验证工具。
//!
//! ```bash
//! # 上电标定（连通性验证）
//! wsg-cli calibrate
//!
//! # 抓取到 62mm
//! wsg-cli grasp --width 62
//!
//! # 张开（缺省到全行程）
//! wsg-cli open
//!
//! # 监控周期遥测
//! wsg-cli monitor --frequency 20
//!
//! # 位置/力稳态控制循环
//! wsg-cli run --position 62 --force 25
//!
//! # 使用非默认网络配置
//! wsg-cli --config gripper.toml calibrate
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use wsg_driver::{
    PositionForceControl, PrepositionMoveMode, PrepositionStopMode, Wsg, WsgConfig,
};
use wsg_transport::UdpTransport;

/// 稳态控制循环节拍
const CONTROL_TICK: Duration = Duration::from_millis(50);

/// WSG CLI - 夹爪命令行工具
#[derive(Parser, Debug)]
#[command(name = "wsg-cli")]
#[command(about = "Command-line tool for WSG gripper bring-up and debugging", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML 配置文件路径（缺省用出厂网络参数）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 上电标定并打印设备信息
    Calibrate,

    /// 抓取到目标宽度（阻塞到运动结束）
    Grasp {
        /// 目标宽度（毫米）
        #[arg(short, long)]
        width: f32,

        /// 运动速度（毫米/秒）
        #[arg(short, long, default_value_t = 50.0)]
        speed: f32,
    },

    /// 张开到指定宽度（缺省全行程）
    Open {
        /// 目标宽度（毫米）
        #[arg(short, long)]
        width: Option<f32>,
    },

    /// 监控周期遥测
    Monitor {
        /// 刷新频率（Hz）
        #[arg(short, long, default_value_t = 20)]
        frequency: u32,
    },

    /// 位置/力稳态控制循环（Ctrl-C 停止）
    Run {
        /// 目标宽度（毫米）
        #[arg(short, long)]
        position: f32,

        /// 力限（牛）
        #[arg(short, long, default_value_t = 20.0)]
        force: f32,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<WsgConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
        }
        None => Ok(WsgConfig::default()),
    }
}

fn connect(config: &WsgConfig) -> Result<PositionForceControl<UdpTransport>> {
    let local = config.local_endpoint().context("invalid local endpoint")?;
    let remote = config.gripper_endpoint().context("invalid gripper endpoint")?;
    info!(%local, %remote, "opening gripper session");

    let transport = UdpTransport::bind(local, remote).context("binding UDP socket")?;
    let wsg = Wsg::new(transport).with_timeouts(config.timeouts.clone());
    let mut control = PositionForceControl::new(wsg, config.update_period_ms);

    control.calibrate().context("gripper calibration")?;
    let info = control.system_info();
    let limits = control.physical_limits();
    println!(
        "gripper ready: fw {:#06x} serial {} stroke {:.1}mm force {:.0}-{:.0}N",
        info.firmware_version,
        info.serial_number,
        limits.stroke_mm,
        limits.min_force,
        limits.overdrive_force,
    );
    Ok(control)
}

fn ctrlc_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .context("installing Ctrl-C handler")?;
    Ok(running)
}

fn print_snapshot(control: &PositionForceControl<UdpTransport>) {
    let s = control.snapshot();
    println!(
        "pos {:7.2} mm  speed {:7.2} mm/s  force {:7.2} N",
        s.position_mm, s.speed_mm_per_s, s.force
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wsg_cli=info".parse()?)
                .add_directive("wsg_driver=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Calibrate => {
            connect(&config)?;
        }
        Commands::Grasp { width, speed } => {
            let mut control = connect(&config)?;
            control.wsg_mut().grasp(width, speed)?;
            control.task()?;
            print_snapshot(&control);
        }
        Commands::Open { width } => {
            let mut control = connect(&config)?;
            let target = width.unwrap_or(control.physical_limits().stroke_mm);
            let speed = control.physical_limits().max_speed_mm_per_s;
            control.wsg_mut().preposition(
                PrepositionStopMode::StopOnBlock,
                PrepositionMoveMode::Absolute,
                target,
                speed,
            )?;
            println!("opened to {target:.1} mm");
        }
        Commands::Monitor { frequency } => {
            let mut control = connect(&config)?;
            let tick = Duration::from_secs_f64(1.0 / f64::from(frequency.max(1)));
            let running = ctrlc_flag()?;
            while running.load(Ordering::SeqCst) {
                control.task()?;
                print_snapshot(&control);
                std::thread::sleep(tick);
            }
        }
        Commands::Run { position, force } => {
            let mut control = connect(&config)?;
            let running = ctrlc_flag()?;
            while running.load(Ordering::SeqCst) {
                control.task()?;
                control.set_position_and_force(position, force)?;
                print_snapshot(&control);
                std::thread::sleep(CONTROL_TICK);
            }
            println!("stopping");
            control.wsg_mut().stop()?;
        }
    }
    Ok(())
}
