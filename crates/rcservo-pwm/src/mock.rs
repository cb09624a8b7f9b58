//! Mock PWM 后端
//!
//! 记录所有成功的调用，并支持注入失败，用于测试和 dry-run。
//! `MockPwm` 是共享句柄：克隆后移入工作线程，原句柄仍可读取调用记录。
//! 长时间运行（dry-run）时用 [`MockPwm::with_history_limit`] 限制记录条数。

use crate::{PwmDeviceError, PwmDeviceErrorKind, PwmError, PwmTransport};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// 一次成功的 PWM 调用
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PwmCall {
    Frequency { channel: u32, hz: f64 },
    PulseWidth { channel: u32, pulse_us: u32 },
}

#[derive(Debug, Default)]
struct MockState {
    calls: VecDeque<PwmCall>,
    /// 调用记录上限（`None` 不限）
    history_limit: Option<usize>,
    /// 成功的脉宽写入总数（不受记录上限影响）
    pulse_writes: usize,
    frequency: HashMap<u32, f64>,
    pulse: HashMap<u32, u32>,
    fail_frequency: bool,
    fail_pulse_width: bool,
    /// 剩余需要失败的脉宽写入次数
    fail_next_pulse_writes: u32,
}

impl MockState {
    fn record(&mut self, call: PwmCall) {
        if self.history_limit == Some(0) {
            return;
        }
        if let Some(limit) = self.history_limit {
            while self.calls.len() >= limit {
                self.calls.pop_front();
            }
        }
        self.calls.push_back(call);
    }
}

/// Mock PWM 传输
#[derive(Debug, Clone, Default)]
pub struct MockPwm {
    state: Arc<Mutex<MockState>>,
}

impl MockPwm {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只保留最近 `limit` 条调用记录
    pub fn with_history_limit(limit: usize) -> Self {
        let pwm = Self::new();
        pwm.state.lock().history_limit = Some(limit);
        pwm
    }

    /// 成功调用的记录（按调用顺序；设置了上限时只含最近的部分）
    pub fn calls(&self) -> Vec<PwmCall> {
        self.state.lock().calls.iter().copied().collect()
    }

    /// 通道最近一次写入的脉宽
    pub fn last_pulse(&self, channel: u32) -> Option<u32> {
        self.state.lock().pulse.get(&channel).copied()
    }

    /// 通道当前的刷新频率
    pub fn frequency(&self, channel: u32) -> Option<f64> {
        self.state.lock().frequency.get(&channel).copied()
    }

    /// 成功写入的脉宽次数
    pub fn pulse_write_count(&self) -> usize {
        self.state.lock().pulse_writes
    }

    /// 让后续所有 `set_frequency` 失败
    pub fn fail_frequency(&self, fail: bool) {
        self.state.lock().fail_frequency = fail;
    }

    /// 让后续所有 `set_pulse_width` 失败
    pub fn fail_pulse_width(&self, fail: bool) {
        self.state.lock().fail_pulse_width = fail;
    }

    /// 让接下来的 `n` 次 `set_pulse_width` 失败
    pub fn fail_next_pulse_writes(&self, n: u32) {
        self.state.lock().fail_next_pulse_writes = n;
    }

    fn injected(what: &str) -> PwmError {
        PwmError::Device(PwmDeviceError::new(
            PwmDeviceErrorKind::Backend,
            format!("injected {} failure", what),
        ))
    }
}

impl PwmTransport for MockPwm {
    fn set_frequency(&mut self, channel: u32, hz: f64) -> Result<(), PwmError> {
        let mut state = self.state.lock();
        if state.fail_frequency {
            return Err(Self::injected("frequency"));
        }
        state.frequency.insert(channel, hz);
        state.record(PwmCall::Frequency { channel, hz });
        Ok(())
    }

    fn set_pulse_width(&mut self, channel: u32, pulse_us: u32) -> Result<(), PwmError> {
        let mut state = self.state.lock();
        if state.fail_next_pulse_writes > 0 {
            state.fail_next_pulse_writes -= 1;
            return Err(Self::injected("pulse width"));
        }
        if state.fail_pulse_width {
            return Err(Self::injected("pulse width"));
        }
        state.pulse.insert(channel, pulse_us);
        state.pulse_writes += 1;
        state.record(PwmCall::PulseWidth { channel, pulse_us });
        Ok(())
    }
}
