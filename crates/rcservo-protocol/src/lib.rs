//! # RC Servo Protocol
//!
//! 舵机控制的数据类型定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `joint`: 关节类型、关节限位、关节限位查询接口
//! - `command`: 位置命令与关联 ID
//! - `event`: 运动开始事件及其发布路径
//!
//! ## 在架构中的位置
//!
//! ```text
//! Protocol Layer (rcservo-protocol)   ← 此 crate
//!     ↓ Command / MotionEvent / JointDescriptor
//! Driver Layer (rcservo-driver)
//!     ↓ PwmTransport
//! PWM Layer (rcservo-pwm)
//!     ↓ sysfs / mock
//! Hardware
//! ```

pub mod command;
pub mod event;
pub mod joint;

// 重新导出常用类型
pub use command::{Command, CorrelationId, PositionCommand};
pub use event::{CommandType, EventTarget, MotionEvent};
pub use joint::{JointDescriptor, JointLimitProvider, JointLimits, JointType, LimitBound};
