//! 命令执行
//!
//! 单条位置命令的完整处理：钳位 → 映射脉宽 → 写 PWM → 计算到达时间
//! → 发布事件 → 返回新状态。
//!
//! PWM 写入失败时立即返回错误，不发布事件，调用方持有的状态保持不变。

use crate::calibration::{Calibration, ProcessorState};
use crate::clock::MonotonicClock;
use crate::metrics::ServoMetrics;
use crate::publisher::MotionPublisher;
use rcservo_protocol::{CommandType, MotionEvent, PositionCommand};
use rcservo_pwm::{PwmError, PwmTransport};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, trace};

/// 运动规划结果（不含时间戳）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionPlan {
    /// 钳位后的目标位置
    pub clamped: f64,
    /// 目标是否超出范围
    pub was_clamped: bool,
    /// 目标脉宽（μs）
    pub pulse_us: u32,
    /// 从当前位置到目标的预计耗时（毫秒）
    pub travel_time_ms: i64,
}

/// 计算一条命令的运动规划（纯函数）
pub fn plan_motion(cal: &Calibration, state: &ProcessorState, target: f64) -> MotionPlan {
    let clamped = cal.clamp(target);
    MotionPlan {
        clamped,
        was_clamped: clamped != target,
        pulse_us: cal.angle_to_pulse(clamped),
        travel_time_ms: cal.travel_time_ms(state.current_angle, clamped),
    }
}

/// 命令执行器
///
/// 持有 PWM 传输和事件发布器；只在工作线程中使用。
pub struct CommandExecutor<T: PwmTransport> {
    transport: T,
    publisher: Arc<dyn MotionPublisher>,
    clock: Arc<dyn MonotonicClock>,
    metrics: Arc<ServoMetrics>,
}

impl<T: PwmTransport> CommandExecutor<T> {
    pub fn new(
        transport: T,
        publisher: Arc<dyn MotionPublisher>,
        clock: Arc<dyn MonotonicClock>,
        metrics: Arc<ServoMetrics>,
    ) -> Self {
        Self {
            transport,
            publisher,
            clock,
            metrics,
        }
    }

    /// 执行一条位置命令
    ///
    /// 成功时返回新状态和已发布的事件；失败时 `state` 不受影响。
    pub fn execute(
        &mut self,
        cal: &Calibration,
        state: &ProcessorState,
        command: PositionCommand,
    ) -> Result<(ProcessorState, MotionEvent), PwmError> {
        let plan = plan_motion(cal, state, command.angle);
        if plan.was_clamped {
            self.metrics.commands_clamped.fetch_add(1, Ordering::Relaxed);
            trace!(
                "Joint '{}': target {} clamped to {}",
                state.joint, command.angle, plan.clamped
            );
        }

        if let Err(e) = self.transport.set_pulse_width(state.pin, plan.pulse_us) {
            self.metrics.transport_failures.fetch_add(1, Ordering::Relaxed);
            return Err(e);
        }

        let now = self.clock.now_ms();
        let event = MotionEvent {
            initial_position: state.current_angle,
            target_position: plan.clamped,
            expected_arrival: now + plan.travel_time_ms,
            command_type: CommandType::Position,
            correlation_id: command.correlation_id,
        };
        self.publisher.publish(&state.event_target, &event);
        self.metrics.events_emitted.fetch_add(1, Ordering::Relaxed);

        debug!(
            "Joint '{}': {:.4} -> {:.4} (pulse {}μs, arrival in {}ms)",
            state.joint, state.current_angle, plan.clamped, plan.pulse_us, plan.travel_time_ms
        );

        let next = ProcessorState {
            current_angle: plan.clamped,
            current_pulse: plan.pulse_us,
            ..state.clone()
        };
        self.metrics.commands_applied.fetch_add(1, Ordering::Relaxed);
        Ok((next, event))
    }

    /// 释放通道（舵机断电）
    pub fn release(&mut self, pin: u32) -> Result<(), PwmError> {
        self.transport.release(pin)
    }
}
