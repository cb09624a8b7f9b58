//! 驱动层错误类型定义

use rcservo_protocol::{JointType, LimitBound};
use rcservo_pwm::PwmError;
use thiserror::Error;

/// 配置错误（致命，处理器无法启动）
///
/// 校验按固定顺序进行，返回第一个失败的检查。
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 舵机参数非法（引脚缺失、脉宽区间非法等）
    #[error("Invalid servo options: {0}")]
    InvalidOptions(String),

    /// 关节不存在
    #[error("Joint '{0}' not found")]
    JointNotFound(String),

    /// 关节类型不支持有界位置控制
    #[error("Joint '{name}' has unsupported type '{joint_type}' (bounded position required)")]
    UnsupportedJointType { joint_type: JointType, name: String },

    /// 关节没有声明限位
    #[error("Joint '{0}' declares no limits")]
    NoLimitsDefined(String),

    /// 缺少某一侧的位置限位
    #[error("Joint '{name}' is missing its {which} limit")]
    MissingLimit { which: LimitBound, name: String },

    /// 位置区间为空或反向
    #[error("Joint '{name}' has an empty position range [{lower}, {upper}]")]
    InvalidRange { name: String, lower: f64, upper: f64 },

    /// 速度限位非正（无法估计运动时间）
    #[error("Joint '{name}' has invalid velocity limit {velocity}")]
    InvalidVelocityLimit { name: String, velocity: f64 },

    /// PWM 初始化失败
    #[error("PWM transport initialization failed: {0}")]
    Transport(#[source] PwmError),

    /// 工作线程启动失败
    #[error("Failed to spawn command worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl ConfigError {
    /// 是否由关节描述引起（修改机器人描述可修复）
    pub fn is_joint_error(&self) -> bool {
        matches!(
            self,
            ConfigError::JointNotFound(_)
                | ConfigError::UnsupportedJointType { .. }
                | ConfigError::NoLimitsDefined(_)
                | ConfigError::MissingLimit { .. }
                | ConfigError::InvalidRange { .. }
                | ConfigError::InvalidVelocityLimit { .. }
        )
    }
}

/// 运行期错误（单条命令失败，处理器继续运行）
#[derive(Error, Debug)]
pub enum DriverError {
    /// PWM 写入失败，本条命令被放弃，状态保持不变
    #[error("PWM transport error: {0}")]
    Transport(#[from] PwmError),

    /// 命令通道已关闭（工作线程退出）
    #[error("Command channel closed")]
    ChannelClosed,

    /// 命令通道已满（异步投递）
    #[error("Command channel full (capacity: {0})")]
    ChannelFull(usize),
}

impl DriverError {
    /// 调用方是否可以重试
    ///
    /// 处理器内部从不重试，由调用方决定。
    pub fn is_retryable(&self) -> bool {
        matches!(self, DriverError::Transport(_) | DriverError::ChannelFull(_))
    }
}
