//! 运动开始事件
//!
//! 每条成功执行的位置命令都会产生一条事件，下游的位置估计器据此在
//! 没有传感器反馈的情况下推算关节当前位置（开环估计）。

use crate::command::CorrelationId;
use std::fmt;

/// 触发运动的命令类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CommandType {
    /// 位置命令
    Position,
}

impl CommandType {
    pub const fn as_str(self) -> &'static str {
        match self {
            CommandType::Position => "position",
        }
    }
}

/// 运动开始事件
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionEvent {
    /// 运动起点（上一次命令钳位后的位置）
    pub initial_position: f64,
    /// 运动终点（本次命令钳位后的位置）
    pub target_position: f64,
    /// 预计到达时间（单调时钟，毫秒）
    pub expected_arrival: i64,
    /// 命令类型
    pub command_type: CommandType,
    /// 关联 ID
    pub correlation_id: Option<CorrelationId>,
}

impl MotionEvent {
    /// 运动距离（绝对值）
    pub fn travel_distance(&self) -> f64 {
        (self.target_position - self.initial_position).abs()
    }

    /// 起点和终点相同（没有实际运动）
    pub fn is_stationary(&self) -> bool {
        self.initial_position == self.target_position
    }
}

/// 事件发布路径
///
/// 按段组织，例如 `actuator/shoulder/servo`。订阅方按前缀匹配。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EventTarget(Vec<String>);

impl EventTarget {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// 执行器的默认路径：`actuator/<joint>`
    pub fn actuator(joint: &str) -> Self {
        Self::new(["actuator", joint])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// 空路径匹配所有目标
    pub fn starts_with(&self, prefix: &EventTarget) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// 追加一段，返回新路径
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }
}

impl fmt::Display for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}
