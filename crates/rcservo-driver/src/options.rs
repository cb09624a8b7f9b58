//! 舵机参数
//!
//! 与关节无关的舵机硬件参数。默认值对应常见的 50Hz、500-2500μs 舵机。

use crate::error::ConfigError;

/// 舵机参数
///
/// # Example
///
/// ```
/// use rcservo_driver::ServoOptions;
///
/// let options = ServoOptions {
///     pin: Some(17),
///     reverse: true,
///     ..ServoOptions::default()
/// };
/// assert_eq!(options.validate().unwrap(), 17);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ServoOptions {
    /// PWM 通道/引脚（必填，> 0）
    pub pin: Option<u32>,
    /// 最小脉宽（μs）
    pub min_pulse: u32,
    /// 最大脉宽（μs）
    pub max_pulse: u32,
    /// 角度增大时脉宽减小
    pub reverse: bool,
    /// PWM 刷新频率（Hz）
    pub update_rate: f64,
    /// 处理器退出时写入 0 脉宽（舵机断电）
    pub release_on_shutdown: bool,
    /// 异步命令邮箱容量
    pub mailbox_capacity: usize,
}

impl ServoOptions {
    pub const DEFAULT_MIN_PULSE: u32 = 500;
    pub const DEFAULT_MAX_PULSE: u32 = 2500;
    pub const DEFAULT_UPDATE_RATE_HZ: f64 = 50.0;
    pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

    /// 使用默认参数并指定引脚
    pub fn with_pin(pin: u32) -> Self {
        Self {
            pin: Some(pin),
            ..Self::default()
        }
    }

    /// 校验参数，成功时返回引脚号
    pub fn validate(&self) -> Result<u32, ConfigError> {
        let pin = self
            .pin
            .ok_or_else(|| ConfigError::InvalidOptions("pin is required".to_string()))?;
        if pin == 0 {
            return Err(ConfigError::InvalidOptions(
                "pin must be a positive integer".to_string(),
            ));
        }
        if self.min_pulse == 0 {
            return Err(ConfigError::InvalidOptions(
                "min_pulse must be a positive integer".to_string(),
            ));
        }
        if self.min_pulse >= self.max_pulse {
            return Err(ConfigError::InvalidOptions(format!(
                "min_pulse ({}) must be less than max_pulse ({})",
                self.min_pulse, self.max_pulse
            )));
        }
        if !self.update_rate.is_finite() || self.update_rate <= 0.0 {
            return Err(ConfigError::InvalidOptions(format!(
                "update_rate must be a positive frequency, got {}",
                self.update_rate
            )));
        }
        // 最大脉宽必须放得进一个 PWM 周期
        let period_us = 1e6 / self.update_rate;
        if f64::from(self.max_pulse) > period_us {
            return Err(ConfigError::InvalidOptions(format!(
                "max_pulse ({}μs) exceeds the PWM period at {}Hz ({:.0}μs)",
                self.max_pulse, self.update_rate, period_us
            )));
        }
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::InvalidOptions(
                "mailbox_capacity must be at least 1".to_string(),
            ));
        }
        Ok(pin)
    }
}

impl Default for ServoOptions {
    fn default() -> Self {
        Self {
            pin: None,
            min_pulse: Self::DEFAULT_MIN_PULSE,
            max_pulse: Self::DEFAULT_MAX_PULSE,
            reverse: false,
            update_rate: Self::DEFAULT_UPDATE_RATE_HZ,
            release_on_shutdown: false,
            mailbox_capacity: Self::DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ServoOptions::default();
        assert_eq!(options.pin, None);
        assert_eq!(options.min_pulse, 500);
        assert_eq!(options.max_pulse, 2500);
        assert!(!options.reverse);
        assert_eq!(options.update_rate, 50.0);
        assert!(!options.release_on_shutdown);
    }

    #[test]
    fn test_pin_required() {
        let err = ServoOptions::default().validate().unwrap_err();
        assert!(err.to_string().contains("pin is required"));

        let err = ServoOptions::with_pin(0).validate().unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_pulse_range() {
        let options = ServoOptions {
            min_pulse: 2000,
            max_pulse: 1000,
            ..ServoOptions::with_pin(1)
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidOptions(_))
        ));

        let options = ServoOptions {
            min_pulse: 1500,
            max_pulse: 1500,
            ..ServoOptions::with_pin(1)
        };
        assert!(options.validate().is_err());

        let options = ServoOptions {
            min_pulse: 0,
            ..ServoOptions::with_pin(1)
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_update_rate() {
        for rate in [0.0, -50.0, f64::NAN, f64::INFINITY] {
            let options = ServoOptions {
                update_rate: rate,
                ..ServoOptions::with_pin(1)
            };
            assert!(options.validate().is_err(), "rate {} accepted", rate);
        }
    }

    #[test]
    fn test_max_pulse_must_fit_period() {
        let options = ServoOptions {
            update_rate: 500.0,
            ..ServoOptions::with_pin(1)
        };
        let err = options.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOptions(_)));
        assert!(err.to_string().contains("exceeds the PWM period"), "{}", err);

        // 400Hz 周期正好 2500μs
        let options = ServoOptions {
            update_rate: 400.0,
            ..ServoOptions::with_pin(1)
        };
        assert_eq!(options.validate().unwrap(), 1);
    }

    #[test]
    fn test_valid_options() {
        let options = ServoOptions {
            min_pulse: 1000,
            max_pulse: 2000,
            update_rate: 330.0,
            ..ServoOptions::with_pin(12)
        };
        assert_eq!(options.validate().unwrap(), 12);
    }
}
