//! 标定构建
//!
//! 从关节限位和舵机参数推导出标定（角度 → 脉宽的线性映射参数），
//! 以及处理器的初始状态。
//!
//! # 校验顺序
//!
//! 依次执行，遇到第一个失败即返回：
//!
//! 1. 关节存在 → `JointNotFound`
//! 2. 关节类型支持有界位置 → `UnsupportedJointType`
//! 3. 声明了限位 → `NoLimitsDefined`
//! 4. 下限存在 → `MissingLimit(Lower)`
//! 5. 上限存在 → `MissingLimit(Upper)`
//! 6. 区间非空 → `InvalidRange`，速度为正 → `InvalidVelocityLimit`

use crate::error::ConfigError;
use crate::options::ServoOptions;
use rcservo_protocol::{
    EventTarget, JointDescriptor, JointLimitProvider, JointLimits, LimitBound,
};

/// 舵机标定（处理器生命周期内不可变）
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// 位置下限
    pub lower_limit: f64,
    /// 位置上限
    pub upper_limit: f64,
    /// 中心位置 `(lower + upper) / 2`
    pub center_angle: f64,
    /// 位置区间宽度 `upper - lower`（> 0）
    pub range: f64,
    /// 最大速度（> 0）
    pub velocity_limit: f64,
    /// 最小脉宽（μs）
    pub min_pulse: u32,
    /// 最大脉宽（μs）
    pub max_pulse: u32,
    /// 脉宽区间宽度 `max_pulse - min_pulse`
    pub pulse_range: u32,
    /// 反向映射
    pub reverse: bool,
    /// PWM 刷新频率（Hz）
    pub update_rate: f64,
}

impl Calibration {
    /// 把位置钳位到关节范围内
    #[inline]
    pub fn clamp(&self, angle: f64) -> f64 {
        angle.clamp(self.lower_limit, self.upper_limit)
    }

    /// 位置 → 脉宽（线性插值，四舍五入到整数微秒）
    ///
    /// 超出范围的输入先钳位。
    pub fn angle_to_pulse(&self, angle: f64) -> u32 {
        let t = (self.clamp(angle) - self.lower_limit) / self.range;
        let span = f64::from(self.pulse_range);
        let pulse = if self.reverse {
            f64::from(self.max_pulse) - t * span
        } else {
            f64::from(self.min_pulse) + t * span
        };
        // 浮点误差可能让结果越过端点一个单位
        (pulse.round() as u32).clamp(self.min_pulse, self.max_pulse)
    }

    /// 脉宽 → 位置（`angle_to_pulse` 的逆映射）
    pub fn pulse_to_angle(&self, pulse_us: u32) -> f64 {
        let pulse = pulse_us.clamp(self.min_pulse, self.max_pulse);
        let mut t = f64::from(pulse - self.min_pulse) / f64::from(self.pulse_range);
        if self.reverse {
            t = 1.0 - t;
        }
        self.lower_limit + t * self.range
    }

    /// 中点脉宽
    pub fn center_pulse(&self) -> u32 {
        ((f64::from(self.min_pulse) + f64::from(self.max_pulse)) / 2.0).round() as u32
    }

    /// 以额定最大速度匀速运动所需时间（毫秒，四舍五入）
    pub fn travel_time_ms(&self, from: f64, to: f64) -> i64 {
        ((from - to).abs() / self.velocity_limit * 1000.0).round() as i64
    }

    /// PWM 周期（μs）
    pub fn period_us(&self) -> f64 {
        1e6 / self.update_rate
    }
}

/// 处理器状态（每条命令更新一次）
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorState {
    /// 关节名称
    pub joint: String,
    /// PWM 通道/引脚
    pub pin: u32,
    /// 事件发布路径
    pub event_target: EventTarget,
    /// 上一次命令钳位后的位置
    pub current_angle: f64,
    /// 上一次写入的脉宽（μs）
    pub current_pulse: u32,
}

/// 已通过校验的关节位置限位
struct BoundedLimits {
    lower: f64,
    upper: f64,
    velocity: f64,
}

fn lookup_joint(
    provider: &dyn JointLimitProvider,
    name: &str,
) -> Result<JointDescriptor, ConfigError> {
    provider.joint(name).ok_or_else(|| ConfigError::JointNotFound(name.to_string()))
}

fn check_joint_type(joint: &JointDescriptor, name: &str) -> Result<(), ConfigError> {
    if joint.joint_type.supports_bounded_position() {
        Ok(())
    } else {
        Err(ConfigError::UnsupportedJointType {
            joint_type: joint.joint_type,
            name: name.to_string(),
        })
    }
}

fn require_limits(joint: &JointDescriptor, name: &str) -> Result<JointLimits, ConfigError> {
    joint.limits.ok_or_else(|| ConfigError::NoLimitsDefined(name.to_string()))
}

fn require_bound(limits: &JointLimits, which: LimitBound, name: &str) -> Result<f64, ConfigError> {
    limits.bound(which).ok_or_else(|| ConfigError::MissingLimit {
        which,
        name: name.to_string(),
    })
}

fn check_bounds(limits: &JointLimits, name: &str) -> Result<BoundedLimits, ConfigError> {
    let lower = require_bound(limits, LimitBound::Lower, name)?;
    let upper = require_bound(limits, LimitBound::Upper, name)?;

    if !(lower.is_finite() && upper.is_finite() && upper > lower) {
        return Err(ConfigError::InvalidRange {
            name: name.to_string(),
            lower,
            upper,
        });
    }
    if !(limits.velocity.is_finite() && limits.velocity > 0.0) {
        return Err(ConfigError::InvalidVelocityLimit {
            name: name.to_string(),
            velocity: limits.velocity,
        });
    }

    Ok(BoundedLimits {
        lower,
        upper,
        velocity: limits.velocity,
    })
}

/// 构建标定和初始状态（纯函数，不触碰硬件）
///
/// `event_target` 为 `None` 时使用 `actuator/<joint>`。
pub fn build_calibration(
    provider: &dyn JointLimitProvider,
    joint: &str,
    options: &ServoOptions,
    event_target: Option<EventTarget>,
) -> Result<(Calibration, ProcessorState), ConfigError> {
    let pin = options.validate()?;

    let descriptor = lookup_joint(provider, joint)?;
    check_joint_type(&descriptor, joint)?;
    let limits = require_limits(&descriptor, joint)?;
    let bounds = check_bounds(&limits, joint)?;

    let calibration = Calibration {
        lower_limit: bounds.lower,
        upper_limit: bounds.upper,
        center_angle: (bounds.lower + bounds.upper) / 2.0,
        range: bounds.upper - bounds.lower,
        velocity_limit: bounds.velocity,
        min_pulse: options.min_pulse,
        max_pulse: options.max_pulse,
        pulse_range: options.max_pulse - options.min_pulse,
        reverse: options.reverse,
        update_rate: options.update_rate,
    };

    let state = ProcessorState {
        joint: joint.to_string(),
        pin,
        event_target: event_target.unwrap_or_else(|| EventTarget::actuator(joint)),
        current_angle: calibration.center_angle,
        current_pulse: calibration.center_pulse(),
    };

    Ok((calibration, state))
}
