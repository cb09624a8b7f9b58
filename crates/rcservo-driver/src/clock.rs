//! 单调时钟
//!
//! 预计到达时间使用进程内单调时钟（毫秒），起点为第一次读取时钟的时刻。
//! 不受系统时间调整影响，只在同一进程内可比较。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// 当前单调时间（毫秒）
pub fn monotonic_ms() -> i64 {
    EPOCH.get_or_init(Instant::now).elapsed().as_millis() as i64
}

/// 时钟接口
pub trait MonotonicClock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// 进程单调时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl MonotonicClock for SystemClock {
    fn now_ms(&self) -> i64 {
        monotonic_ms()
    }
}

/// 手动推进的时钟（测试、回放）
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl MonotonicClock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
