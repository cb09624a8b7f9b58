//! 处理器会话
//!
//! 加载配置、选择 PWM 后端并启动处理器。

use anyhow::{Context, Result};
use clap::Args;
use rcservo_driver::{MotionPublisher, ServoBuilder, ServoProcessor};
use rcservo_pwm::{MockPwm, PwmTransport};
use rcservo_tools::ServoConfigFile;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// dry-run 时 Mock PWM 保留的调用记录条数
const DRY_RUN_HISTORY: usize = 1024;

/// PWM 后端参数
#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// 不访问硬件，使用 Mock PWM
    #[arg(long)]
    pub dry_run: bool,

    /// sysfs PWM 芯片编号（/sys/class/pwm/pwmchipN）
    #[arg(long, default_value_t = 0)]
    pub chip: u32,

    /// 对应 sysfs 通道 pwm0 的引脚号（引脚 N 使用 pwm<N - pin_base>）
    #[arg(long, default_value_t = 1)]
    pub pin_base: u32,

    /// 覆盖配置文件中的引脚
    #[arg(long)]
    pub pin: Option<u32>,
}

impl TransportArgs {
    /// 打开 PWM 后端
    pub fn open(&self) -> Result<Box<dyn PwmTransport + Send>> {
        if self.dry_run {
            info!("Dry run: using mock PWM backend");
            return Ok(Box::new(MockPwm::with_history_limit(DRY_RUN_HISTORY)));
        }
        open_sysfs(self.chip, self.pin_base)
    }
}

#[cfg(target_os = "linux")]
fn open_sysfs(chip: u32, pin_base: u32) -> Result<Box<dyn PwmTransport + Send>> {
    let pwm = rcservo_pwm::SysfsPwm::new(chip)
        .with_context(|| format!("无法打开 PWM 芯片 pwmchip{}", chip))?
        .with_pin_base(pin_base);
    Ok(Box::new(pwm))
}

#[cfg(not(target_os = "linux"))]
fn open_sysfs(_chip: u32, _pin_base: u32) -> Result<Box<dyn PwmTransport + Send>> {
    anyhow::bail!("当前平台没有 PWM 硬件后端，请使用 --dry-run")
}

/// 加载配置文件
pub fn load_config(path: &Path) -> Result<ServoConfigFile> {
    ServoConfigFile::load_from_file(path)
        .with_context(|| format!("加载配置文件失败: {}", path.display()))
}

/// 根据配置启动处理器
pub fn start(
    config: &ServoConfigFile,
    transport: &TransportArgs,
    publisher: Arc<dyn MotionPublisher>,
) -> Result<ServoProcessor> {
    let mut options = config.servo.to_options();
    if let Some(pin) = transport.pin {
        options.pin = Some(pin);
    }

    let processor = ServoBuilder::new(config.servo.joint.clone())
        .joint_limits(Arc::new(config.robot.clone()))
        .options(options)
        .event_target(config.servo.event_target())
        .transport(transport.open()?)
        .publisher(publisher)
        .build()
        .with_context(|| format!("启动关节 '{}' 的舵机处理器失败", config.servo.joint))?;

    Ok(processor)
}
