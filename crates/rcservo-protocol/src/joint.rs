//! 关节描述与限位查询
//!
//! 关节是与执行器硬件无关的抽象自由度。舵机只能驱动具有有界位置范围的关节，
//! 因此关节类型和限位是否完整决定了能否为其生成标定。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 关节类型
///
/// 与常见机器人描述格式（URDF）中的关节类型一一对应。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum JointType {
    /// 旋转关节（有上下限）
    Revolute,
    /// 平移关节（有上下限）
    Prismatic,
    /// 连续旋转关节（无上下限）
    Continuous,
    /// 固定关节
    Fixed,
    /// 浮动关节（6 自由度）
    Floating,
    /// 平面关节
    Planar,
}

impl JointType {
    /// 是否支持有界位置控制
    ///
    /// 只有 `Revolute` 和 `Prismatic` 具有可映射到脉宽的有限位置区间。
    pub const fn supports_bounded_position(self) -> bool {
        matches!(self, JointType::Revolute | JointType::Prismatic)
    }

    /// 获取类型名称
    pub const fn name(self) -> &'static str {
        match self {
            JointType::Revolute => "revolute",
            JointType::Prismatic => "prismatic",
            JointType::Continuous => "continuous",
            JointType::Fixed => "fixed",
            JointType::Floating => "floating",
            JointType::Planar => "planar",
        }
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 位置限位的哪一侧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LimitBound {
    /// 下限
    Lower,
    /// 上限
    Upper,
}

impl fmt::Display for LimitBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitBound::Lower => f.write_str("lower"),
            LimitBound::Upper => f.write_str("upper"),
        }
    }
}

/// 关节限位
///
/// 位置限位可以缺省（例如描述文件里只写了速度和力矩），缺省的一侧会在
/// 标定阶段被拒绝。`effort` 仅随描述携带，控制逻辑不使用它。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointLimits {
    /// 位置下限（rad 或 m）
    #[cfg_attr(feature = "serde", serde(default))]
    pub lower: Option<f64>,
    /// 位置上限（rad 或 m）
    #[cfg_attr(feature = "serde", serde(default))]
    pub upper: Option<f64>,
    /// 最大速度（rad/s 或 m/s）
    #[cfg_attr(feature = "serde", serde(default))]
    pub velocity: f64,
    /// 最大力矩/力
    #[cfg_attr(feature = "serde", serde(default))]
    pub effort: f64,
}

impl JointLimits {
    /// 创建位置上下限都存在的限位
    pub const fn new(lower: f64, upper: f64, velocity: f64, effort: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
            velocity,
            effort,
        }
    }

    /// 获取指定一侧的位置限位
    pub fn bound(&self, which: LimitBound) -> Option<f64> {
        match which {
            LimitBound::Lower => self.lower,
            LimitBound::Upper => self.upper,
        }
    }
}

/// 关节描述
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointDescriptor {
    /// 关节类型
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub joint_type: JointType,
    /// 关节限位（`None` 表示描述中没有声明限位）
    #[cfg_attr(feature = "serde", serde(default))]
    pub limits: Option<JointLimits>,
}

impl JointDescriptor {
    pub fn new(joint_type: JointType, limits: Option<JointLimits>) -> Self {
        Self { joint_type, limits }
    }

    /// 有完整限位的旋转关节
    pub fn revolute(limits: JointLimits) -> Self {
        Self::new(JointType::Revolute, Some(limits))
    }
}

/// 关节限位查询接口
///
/// 以注入能力的方式提供整机的关节描述，而不是全局单例。测试中可以直接用
/// `HashMap<String, JointDescriptor>` 作为替身。
pub trait JointLimitProvider: Send + Sync {
    /// 按名称查询关节描述，找不到返回 `None`
    fn joint(&self, name: &str) -> Option<JointDescriptor>;
}

impl JointLimitProvider for HashMap<String, JointDescriptor> {
    fn joint(&self, name: &str) -> Option<JointDescriptor> {
        self.get(name).cloned()
    }
}

impl<P: JointLimitProvider + ?Sized> JointLimitProvider for Arc<P> {
    fn joint(&self, name: &str) -> Option<JointDescriptor> {
        (**self).joint(name)
    }
}

impl<P: JointLimitProvider + ?Sized> JointLimitProvider for &P {
    fn joint(&self, name: &str) -> Option<JointDescriptor> {
        (**self).joint(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_bounded_position() {
        assert!(JointType::Revolute.supports_bounded_position());
        assert!(JointType::Prismatic.supports_bounded_position());
        assert!(!JointType::Continuous.supports_bounded_position());
        assert!(!JointType::Fixed.supports_bounded_position());
        assert!(!JointType::Floating.supports_bounded_position());
        assert!(!JointType::Planar.supports_bounded_position());
    }

    #[test]
    fn test_joint_type_display() {
        assert_eq!(JointType::Continuous.to_string(), "continuous");
        assert_eq!(LimitBound::Upper.to_string(), "upper");
    }

    #[test]
    fn test_limits_bound() {
        let limits = JointLimits {
            lower: Some(-1.0),
            upper: None,
            velocity: 1.0,
            effort: 0.0,
        };
        assert_eq!(limits.bound(LimitBound::Lower), Some(-1.0));
        assert_eq!(limits.bound(LimitBound::Upper), None);
    }

    #[test]
    fn test_hashmap_provider() {
        let mut joints = HashMap::new();
        joints.insert(
            "shoulder".to_string(),
            JointDescriptor::revolute(JointLimits::new(-1.0, 1.0, 2.0, 1.0)),
        );

        let provider: Arc<dyn JointLimitProvider> = Arc::new(joints);
        let joint = provider.joint("shoulder").unwrap();
        assert_eq!(joint.joint_type, JointType::Revolute);
        assert!(provider.joint("elbow").is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_descriptor_serde_field_names() {
        let json = r#"{"type":"revolute","limits":{"lower":-0.5,"velocity":1.5}}"#;
        let joint: JointDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(joint.joint_type, JointType::Revolute);
        let limits = joint.limits.unwrap();
        assert_eq!(limits.lower, Some(-0.5));
        assert_eq!(limits.upper, None);
        assert_eq!(limits.effort, 0.0);
    }
}
