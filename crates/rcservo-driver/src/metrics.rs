//! 处理器指标
//!
//! 原子计数器，可以在任何线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 舵机处理器指标
///
/// # 使用示例
///
/// ```rust
/// use rcservo_driver::ServoMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = ServoMetrics::new();
/// metrics.commands_received.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.commands_received, 1);
/// ```
#[derive(Debug, Default)]
pub struct ServoMetrics {
    /// 工作线程收到的命令总数（三种投递方式合计）
    pub commands_received: AtomicU64,

    /// 成功执行的命令数（脉宽已写入、状态已更新）
    pub commands_applied: AtomicU64,

    /// 目标位置超出范围而被钳位的命令数
    pub commands_clamped: AtomicU64,

    /// PWM 写入失败次数
    pub transport_failures: AtomicU64,

    /// 交给发布器的运动事件数
    ///
    /// 每条成功命令计一次，与发布器是否实际送达无关
    /// （`NullPublisher` 或订阅方队列满时同样计数）。
    pub events_emitted: AtomicU64,

    /// 异步投递因邮箱满被拒绝的次数
    ///
    /// 持续增长说明命令产生速度超过了 PWM 写入速度。
    pub mailbox_full: AtomicU64,
}

impl ServoMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commands_received: self.commands_received.load(Ordering::Relaxed),
            commands_applied: self.commands_applied.load(Ordering::Relaxed),
            commands_clamped: self.commands_clamped.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            mailbox_full: self.mailbox_full.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.commands_received.store(0, Ordering::Relaxed);
        self.commands_applied.store(0, Ordering::Relaxed);
        self.commands_clamped.store(0, Ordering::Relaxed);
        self.transport_failures.store(0, Ordering::Relaxed);
        self.events_emitted.store(0, Ordering::Relaxed);
        self.mailbox_full.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub commands_received: u64,
    pub commands_applied: u64,
    pub commands_clamped: u64,
    pub transport_failures: u64,
    pub events_emitted: u64,
    pub mailbox_full: u64,
}

impl MetricsSnapshot {
    /// 失败率（transport_failures / commands_received）
    pub fn failure_rate(&self) -> f64 {
        if self.commands_received == 0 {
            0.0
        } else {
            self.transport_failures as f64 / self.commands_received as f64
        }
    }
}
