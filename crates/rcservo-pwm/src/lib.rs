//! # RC Servo PWM Layer
//!
//! PWM 硬件抽象层，提供统一的脉宽输出接口。
//!
//! - Linux: `sysfs` 后端（`/sys/class/pwm`）
//! - 测试 / dry-run: `mock` 后端（feature `mock`）

use thiserror::Error;

#[cfg(target_os = "linux")]
pub mod sysfs;

#[cfg(target_os = "linux")]
pub use sysfs::{DEFAULT_PIN_BASE, SysfsPwm};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockPwm, PwmCall};

/// PWM 适配层统一错误类型
#[derive(Error, Debug)]
pub enum PwmError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] PwmDeviceError),
    #[error("Invalid channel: {0}")]
    InvalidChannel(u32),
    #[error("Channel {0} not configured (set frequency first)")]
    NotConfigured(u32),
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmDeviceErrorKind {
    Unknown,
    NotFound,
    AccessDenied,
    Busy,
    InvalidValue,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct PwmDeviceError {
    pub kind: PwmDeviceErrorKind,
    pub message: String,
}

impl PwmDeviceError {
    pub fn new(kind: PwmDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            PwmDeviceErrorKind::NotFound | PwmDeviceErrorKind::AccessDenied
        )
    }
}

impl From<String> for PwmDeviceError {
    fn from(message: String) -> Self {
        Self::new(PwmDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for PwmDeviceError {
    fn from(message: &str) -> Self {
        Self::new(PwmDeviceErrorKind::Unknown, message)
    }
}

/// PWM 输出接口
///
/// 通道号由具体后端解释（GPIO 引脚号、PWM 控制器通道等）。
/// 调用方保证同一个传输对象只在一个线程中顺序使用。
pub trait PwmTransport {
    /// 设置通道的 PWM 刷新频率（Hz）
    fn set_frequency(&mut self, channel: u32, hz: f64) -> Result<(), PwmError>;

    /// 设置通道的脉宽（微秒）
    fn set_pulse_width(&mut self, channel: u32, pulse_us: u32) -> Result<(), PwmError>;

    /// 释放通道（舵机断电，不再保持位置）
    ///
    /// 默认实现写入 0 脉宽。
    fn release(&mut self, channel: u32) -> Result<(), PwmError> {
        self.set_pulse_width(channel, 0)
    }
}

impl<T: PwmTransport + ?Sized> PwmTransport for Box<T> {
    fn set_frequency(&mut self, channel: u32, hz: f64) -> Result<(), PwmError> {
        (**self).set_frequency(channel, hz)
    }

    fn set_pulse_width(&mut self, channel: u32, pulse_us: u32) -> Result<(), PwmError> {
        (**self).set_pulse_width(channel, pulse_us)
    }

    fn release(&mut self, channel: u32) -> Result<(), PwmError> {
        (**self).release(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pwm_error_display() {
        let err = PwmError::InvalidChannel(3);
        assert_eq!(err.to_string(), "Invalid channel: 3");

        let err = PwmError::Device(PwmDeviceError::new(PwmDeviceErrorKind::Busy, "in use"));
        assert_eq!(err.to_string(), "Device Error: Busy: in use");

        let err = PwmError::NotConfigured(1);
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn test_device_error_fatal() {
        assert!(PwmDeviceError::new(PwmDeviceErrorKind::NotFound, "x").is_fatal());
        assert!(PwmDeviceError::new(PwmDeviceErrorKind::AccessDenied, "x").is_fatal());
        assert!(!PwmDeviceError::new(PwmDeviceErrorKind::Busy, "x").is_fatal());
        assert!(!PwmDeviceError::from("plain").is_fatal());
    }

    #[test]
    fn test_boxed_transport_default_release() {
        let mock = MockPwm::new();
        let mut boxed: Box<dyn PwmTransport> = Box::new(mock.clone());
        boxed.set_frequency(4, 50.0).unwrap();
        boxed.set_pulse_width(4, 1500).unwrap();
        boxed.release(4).unwrap();
        assert_eq!(mock.last_pulse(4), Some(0));
    }
}
