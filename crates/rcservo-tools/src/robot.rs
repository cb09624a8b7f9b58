//! # 机器人描述
//!
//! 按名称索引的关节集合，实现 [`JointLimitProvider`]。

use rcservo_protocol::{JointDescriptor, JointLimitProvider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 机器人描述
///
/// 关节按名称有序存放，序列化结果稳定。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotDescription {
    /// 机器人名称
    #[serde(default)]
    pub name: String,

    /// 关节表
    #[serde(default)]
    pub joints: BTreeMap<String, JointDescriptor>,
}

impl RobotDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            joints: BTreeMap::new(),
        }
    }

    /// 添加关节（同名关节被替换）
    pub fn with_joint(mut self, name: impl Into<String>, joint: JointDescriptor) -> Self {
        self.joints.insert(name.into(), joint);
        self
    }

    /// 所有关节名称
    pub fn joint_names(&self) -> impl Iterator<Item = &str> {
        self.joints.keys().map(String::as_str)
    }

    /// 可以由舵机驱动的关节（类型支持有界位置且上下限完整）
    pub fn actuatable_joints(&self) -> impl Iterator<Item = &str> {
        self.joints
            .iter()
            .filter(|(_, j)| {
                j.joint_type.supports_bounded_position()
                    && j.limits.is_some_and(|l| l.lower.is_some() && l.upper.is_some())
            })
            .map(|(name, _)| name.as_str())
    }
}

impl JointLimitProvider for RobotDescription {
    fn joint(&self, name: &str) -> Option<JointDescriptor> {
        self.joints.get(name).cloned()
    }
}
