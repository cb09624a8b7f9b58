//! # 配置文件
//!
//! 一个 TOML 文件同时包含机器人描述和舵机配置：
//!
//! ```toml
//! [robot]
//! name = "arm"
//!
//! [robot.joints.shoulder]
//! type = "revolute"
//! limits = { lower = -0.7854, upper = 0.7854, velocity = 1.0, effort = 1.0 }
//!
//! [servo]
//! joint = "shoulder"
//! pin = 17
//! ```

use crate::robot::RobotDescription;
use crate::servo::ServoSection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 配置文件错误
#[derive(Error, Debug)]
pub enum ToolsError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// 舵机配置文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServoConfigFile {
    /// 机器人描述
    #[serde(default)]
    pub robot: RobotDescription,

    /// 舵机配置
    pub servo: ServoSection,
}

impl ServoConfigFile {
    /// 从 TOML 文本解析
    pub fn parse(content: &str) -> Result<Self, ToolsError> {
        Ok(toml::from_str(content)?)
    }

    /// 从文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ToolsError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// 保存到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ToolsError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcservo_protocol::{JointLimitProvider, JointType, LimitBound};

    const EXAMPLE: &str = r#"
[robot]
name = "arm"

[robot.joints.shoulder]
type = "revolute"
limits = { lower = -0.7854, upper = 0.7854, velocity = 1.0, effort = 1.0 }

[robot.joints.wheel]
type = "continuous"

[servo]
joint = "shoulder"
pin = 17
reverse = true
"#;

    #[test]
    fn test_parse_example() {
        let config = ServoConfigFile::parse(EXAMPLE).unwrap();
        assert_eq!(config.robot.name, "arm");

        let shoulder = config.robot.joint("shoulder").unwrap();
        assert_eq!(shoulder.joint_type, JointType::Revolute);
        let limits = shoulder.limits.unwrap();
        assert_eq!(limits.bound(LimitBound::Lower), Some(-0.7854));
        assert_eq!(limits.velocity, 1.0);

        let wheel = config.robot.joint("wheel").unwrap();
        assert_eq!(wheel.joint_type, JointType::Continuous);
        assert!(wheel.limits.is_none());

        assert_eq!(config.servo.pin, Some(17));
        assert!(config.servo.reverse);
        assert_eq!(config.servo.min_pulse, 500);
        assert_eq!(config.servo.max_pulse, 2500);
        assert_eq!(config.servo.update_rate, 50.0);
    }

    #[test]
    fn test_missing_servo_section() {
        let err = ServoConfigFile::parse("[robot]\nname = \"x\"\n").unwrap_err();
        assert!(matches!(err, ToolsError::Parse(_)));
    }

    #[test]
    fn test_unknown_joint_type() {
        let content = r#"
[robot.joints.j]
type = "ball"

[servo]
joint = "j"
"#;
        assert!(ServoConfigFile::parse(content).is_err());
    }
}
