//! 命令类型定义
//!
//! 三种投递方式（广播订阅、异步直投、同步带应答）共用同一种命令格式。

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// 命令关联 ID
///
/// 由命令发起方生成，原样回填到运动事件中，用于把事件和命令对应起来。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CorrelationId(u64);

static NEXT_CORRELATION_ID: AtomicU64 = AtomicU64::new(1);

impl CorrelationId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// 生成进程内唯一的 ID（单调递增，从 1 开始）
    pub fn next() -> Self {
        Self(NEXT_CORRELATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for CorrelationId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// 位置命令
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionCommand {
    /// 目标位置（rad 或 m），超出关节范围时会被钳位
    pub angle: f64,
    /// 可选的关联 ID
    #[cfg_attr(feature = "serde", serde(default))]
    pub correlation_id: Option<CorrelationId>,
}

impl PositionCommand {
    pub const fn new(angle: f64) -> Self {
        Self {
            angle,
            correlation_id: None,
        }
    }

    /// 附加关联 ID
    pub const fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }
}

/// 执行器命令
///
/// 目前只有位置命令；保持为枚举以便订阅通道承载多种消息。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "lowercase"))]
pub enum Command {
    /// 位置命令
    Position(PositionCommand),
}

impl Command {
    /// 创建不带关联 ID 的位置命令
    pub const fn position(angle: f64) -> Self {
        Command::Position(PositionCommand::new(angle))
    }
}

impl From<PositionCommand> for Command {
    fn from(cmd: PositionCommand) -> Self {
        Command::Position(cmd)
    }
}
