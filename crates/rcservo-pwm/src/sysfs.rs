//! Linux sysfs PWM 后端
//!
//! 通过 `/sys/class/pwm/pwmchipN/pwmM/` 下的属性文件驱动 PWM：
//!
//! | 文件 | 含义 |
//! |------|------|
//! | `period` | 周期（ns） |
//! | `duty_cycle` | 高电平时间（ns），必须 <= period |
//! | `enable` | 1 输出 / 0 关闭 |
//!
//! 传输接口上的通道号是舵机引脚号（从 1 开始），按 `pin - pin_base` 换算为
//! `pwmM` 中的 `M`：默认 `pin_base = 1`，即引脚 1 对应 `pwm0`。
//! 未导出的通道会先写入 `export`。

use crate::{PwmDeviceError, PwmDeviceErrorKind, PwmError, PwmTransport};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// sysfs PWM 根目录
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/pwm";

/// 默认引脚基数：引脚 1 对应 `pwm0`
pub const DEFAULT_PIN_BASE: u32 = 1;

/// sysfs PWM 传输
#[derive(Debug)]
pub struct SysfsPwm {
    /// 芯片目录（`<root>/pwmchipN`）
    chip_dir: PathBuf,
    /// 对应 `pwm0` 的引脚号
    pin_base: u32,
    /// 已配置引脚的周期（ns）
    periods: HashMap<u32, u64>,
}

impl SysfsPwm {
    /// 打开默认根目录下的 `pwmchip<chip>`
    pub fn new(chip: u32) -> Result<Self, PwmError> {
        Self::with_root(DEFAULT_SYSFS_ROOT, chip)
    }

    /// 打开指定根目录下的 `pwmchip<chip>`（测试时可指向临时目录）
    pub fn with_root(root: impl AsRef<Path>, chip: u32) -> Result<Self, PwmError> {
        let chip_dir = root.as_ref().join(format!("pwmchip{}", chip));
        if !chip_dir.is_dir() {
            return Err(PwmError::Device(PwmDeviceError::new(
                PwmDeviceErrorKind::NotFound,
                format!("PWM chip not found: {}", chip_dir.display()),
            )));
        }
        debug!("Opened sysfs PWM chip at {}", chip_dir.display());
        Ok(Self {
            chip_dir,
            pin_base: DEFAULT_PIN_BASE,
            periods: HashMap::new(),
        })
    }

    /// 设置对应 `pwm0` 的引脚号
    pub fn with_pin_base(mut self, pin_base: u32) -> Self {
        self.pin_base = pin_base;
        self
    }

    /// 引脚号 → 芯片通道号
    pub fn hw_channel(&self, pin: u32) -> Result<u32, PwmError> {
        pin.checked_sub(self.pin_base).ok_or(PwmError::InvalidChannel(pin))
    }

    fn channel_dir(&self, pin: u32) -> Result<PathBuf, PwmError> {
        Ok(self.chip_dir.join(format!("pwm{}", self.hw_channel(pin)?)))
    }

    /// 确保引脚对应的通道已导出
    fn ensure_exported(&self, pin: u32) -> Result<PathBuf, PwmError> {
        let dir = self.channel_dir(pin)?;
        if dir.is_dir() {
            return Ok(dir);
        }

        let hw = self.hw_channel(pin)?;
        trace!("Exporting PWM channel {} for pin {}", hw, pin);
        write_attr(&self.chip_dir.join("export"), &hw.to_string())?;

        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(PwmError::InvalidChannel(pin))
        }
    }

    fn read_duty_ns(dir: &Path) -> u64 {
        fs::read_to_string(dir.join("duty_cycle"))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// 写入 sysfs 属性，把权限错误映射为结构化设备错误
fn write_attr(path: &Path, value: &str) -> Result<(), PwmError> {
    fs::write(path, value).map_err(|e| match e.kind() {
        io::ErrorKind::PermissionDenied => PwmError::Device(PwmDeviceError::new(
            PwmDeviceErrorKind::AccessDenied,
            format!("{}: {}", path.display(), e),
        )),
        io::ErrorKind::NotFound => PwmError::Device(PwmDeviceError::new(
            PwmDeviceErrorKind::NotFound,
            format!("{}: {}", path.display(), e),
        )),
        _ => PwmError::Io(e),
    })
}

impl PwmTransport for SysfsPwm {
    fn set_frequency(&mut self, channel: u32, hz: f64) -> Result<(), PwmError> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(PwmError::Device(PwmDeviceError::new(
                PwmDeviceErrorKind::InvalidValue,
                format!("invalid PWM frequency: {} Hz", hz),
            )));
        }

        let dir = self.ensure_exported(channel)?;
        let period_ns = (1e9 / hz).round() as u64;

        // 内核要求 duty_cycle <= period，缩短周期前先清零占空比
        if Self::read_duty_ns(&dir) > period_ns {
            write_attr(&dir.join("duty_cycle"), "0")?;
        }

        write_attr(&dir.join("period"), &period_ns.to_string())?;
        write_attr(&dir.join("enable"), "1")?;
        self.periods.insert(channel, period_ns);

        debug!(
            "PWM pin {} ({}) period set to {} ns ({} Hz)",
            channel,
            dir.display(),
            period_ns,
            hz
        );
        Ok(())
    }

    fn set_pulse_width(&mut self, channel: u32, pulse_us: u32) -> Result<(), PwmError> {
        let period_ns = *self.periods.get(&channel).ok_or(PwmError::NotConfigured(channel))?;
        let duty_ns = u64::from(pulse_us) * 1_000;
        if duty_ns > period_ns {
            return Err(PwmError::Device(PwmDeviceError::new(
                PwmDeviceErrorKind::InvalidValue,
                format!(
                    "pulse width {} us exceeds period {} ns on channel {}",
                    pulse_us, period_ns, channel
                ),
            )));
        }

        write_attr(&self.channel_dir(channel)?.join("duty_cycle"), &duty_ns.to_string())?;
        trace!("PWM channel {} duty_cycle = {} ns", channel, duty_ns);
        Ok(())
    }
}
