//! # RC Servo Tools - 配置文件
//!
//! **依赖原则**: 只依赖 `rcservo-protocol` 和 `rcservo-driver` 的参数类型，不引入硬件后端
//!
//! ## 包含模块
//!
//! - `robot` - 机器人描述（关节表，实现 `JointLimitProvider`）
//! - `servo` - `[servo]` 配置段
//! - `config` - TOML 文件读写

pub mod config;
pub mod robot;
pub mod servo;

// 重新导出常用类型
pub use config::{ServoConfigFile, ToolsError};
pub use robot::RobotDescription;
pub use servo::ServoSection;
