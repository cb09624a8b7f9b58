//! # 舵机配置段
//!
//! `[servo]` 段：关节绑定和硬件参数，缺省字段取 [`ServoOptions`] 的默认值。

use rcservo_driver::ServoOptions;
use rcservo_protocol::EventTarget;
use serde::{Deserialize, Serialize};

/// 舵机配置段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServoSection {
    /// 驱动的关节名称
    pub joint: String,

    /// PWM 通道/引脚
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<u32>,

    /// 最小脉宽（μs）
    #[serde(default = "default_min_pulse")]
    pub min_pulse: u32,

    /// 最大脉宽（μs）
    #[serde(default = "default_max_pulse")]
    pub max_pulse: u32,

    /// 反向映射
    #[serde(default)]
    pub reverse: bool,

    /// PWM 刷新频率（Hz）
    #[serde(default = "default_update_rate")]
    pub update_rate: f64,

    /// 退出时释放舵机
    #[serde(default)]
    pub release_on_shutdown: bool,

    /// 事件发布路径（`/` 分隔，缺省为 `actuator/<joint>`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_target: Option<String>,
}

fn default_min_pulse() -> u32 {
    ServoOptions::DEFAULT_MIN_PULSE
}

fn default_max_pulse() -> u32 {
    ServoOptions::DEFAULT_MAX_PULSE
}

fn default_update_rate() -> f64 {
    ServoOptions::DEFAULT_UPDATE_RATE_HZ
}

impl ServoSection {
    /// 使用默认硬件参数
    pub fn new(joint: impl Into<String>, pin: u32) -> Self {
        Self {
            joint: joint.into(),
            pin: Some(pin),
            min_pulse: default_min_pulse(),
            max_pulse: default_max_pulse(),
            reverse: false,
            update_rate: default_update_rate(),
            release_on_shutdown: false,
            event_target: None,
        }
    }

    /// 转换为驱动参数（不做校验，校验在构建处理器时进行）
    pub fn to_options(&self) -> ServoOptions {
        ServoOptions {
            pin: self.pin,
            min_pulse: self.min_pulse,
            max_pulse: self.max_pulse,
            reverse: self.reverse,
            update_rate: self.update_rate,
            release_on_shutdown: self.release_on_shutdown,
            ..ServoOptions::default()
        }
    }

    /// 解析事件发布路径
    pub fn event_target(&self) -> EventTarget {
        match &self.event_target {
            Some(path) => EventTarget::new(path.split('/').filter(|s| !s.is_empty())),
            None => EventTarget::actuator(&self.joint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_options() {
        let section = ServoSection {
            reverse: true,
            ..ServoSection::new("shoulder", 17)
        };
        let options = section.to_options();
        assert_eq!(options.pin, Some(17));
        assert!(options.reverse);
        assert_eq!(options.min_pulse, 500);
        assert_eq!(options.mailbox_capacity, ServoOptions::DEFAULT_MAILBOX_CAPACITY);
    }

    #[test]
    fn test_event_target() {
        let section = ServoSection::new("shoulder", 1);
        assert_eq!(section.event_target(), EventTarget::actuator("shoulder"));

        let section = ServoSection {
            event_target: Some("/arm/left//wrist".to_string()),
            ..ServoSection::new("wrist", 1)
        };
        assert_eq!(
            section.event_target(),
            EventTarget::new(["arm", "left", "wrist"])
        );
    }
}
