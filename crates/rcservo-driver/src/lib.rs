//! 驱动层模块
//!
//! 本模块提供 RC 舵机的位置命令处理器，包括：
//! - 标定构建（关节限位 → 角度/脉宽线性映射）
//! - 命令执行（钳位、PWM 写入、到达时间估计、事件发布）
//! - 工作线程（订阅 / 异步 / 同步三种投递方式，顺序执行）
//! - 状态同步（ArcSwap 无锁读取）
//!
//! # 使用场景
//!
//! 每个物理舵机对应一个 [`ServoProcessor`]，由 [`ServoBuilder`] 创建。

mod builder;
pub mod calibration;
pub mod clock;
mod error;
pub mod executor;
pub mod metrics;
mod options;
mod processor;
pub mod publisher;
mod worker;

pub use builder::{ServoBuilder, init};
pub use calibration::{Calibration, ProcessorState, build_calibration};
pub use clock::{ManualClock, MonotonicClock, SystemClock, monotonic_ms};
pub use error::{ConfigError, DriverError};
pub use executor::{CommandExecutor, MotionPlan, plan_motion};
pub use metrics::{MetricsSnapshot, ServoMetrics};
pub use options::ServoOptions;
pub use processor::{ServoHandle, ServoProcessor};
pub use publisher::{MotionEventBus, MotionPublisher, NullPublisher, PublishedEvent};
pub use worker::{Acknowledged, Origin};
