//! Builder 模式实现
//!
//! 提供链式构造 `ServoProcessor` 的方式。

use crate::calibration::build_calibration;
use crate::clock::{MonotonicClock, SystemClock};
use crate::error::ConfigError;
use crate::executor::CommandExecutor;
use crate::metrics::ServoMetrics;
use crate::options::ServoOptions;
use crate::processor::{ServoHandle, ServoProcessor};
use crate::publisher::{MotionPublisher, NullPublisher};
use crate::worker::{BoxedTransport, Worker, command_loop, forward_subscription};
use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, bounded};
use rcservo_protocol::{Command, EventTarget, JointLimitProvider};
use rcservo_pwm::PwmTransport;
use std::sync::Arc;
use std::thread;
use tracing::info;

/// 舵机处理器 Builder
///
/// # Example
///
/// ```
/// use rcservo_driver::{ServoBuilder, ServoOptions};
/// use rcservo_protocol::{JointDescriptor, JointLimits};
/// use rcservo_pwm::MockPwm;
/// use std::collections::HashMap;
/// use std::sync::Arc;
///
/// let mut joints = HashMap::new();
/// joints.insert(
///     "shoulder".to_string(),
///     JointDescriptor::revolute(JointLimits::new(-0.7854, 0.7854, 1.0, 1.0)),
/// );
///
/// let servo = ServoBuilder::new("shoulder")
///     .joint_limits(Arc::new(joints))
///     .options(ServoOptions::with_pin(17))
///     .transport(MockPwm::new())
///     .build()
///     .unwrap();
///
/// let ack = servo.handle_position_command(0.7854, None).unwrap();
/// assert_eq!(ack.pulse_us, 2500);
/// ```
pub struct ServoBuilder {
    joint: String,
    provider: Option<Arc<dyn JointLimitProvider>>,
    options: ServoOptions,
    transport: Option<BoxedTransport>,
    publisher: Arc<dyn MotionPublisher>,
    subscription: Option<Receiver<Command>>,
    clock: Arc<dyn MonotonicClock>,
    event_target: Option<EventTarget>,
}

impl ServoBuilder {
    /// 为指定关节创建 Builder
    pub fn new(joint: impl Into<String>) -> Self {
        Self {
            joint: joint.into(),
            provider: None,
            options: ServoOptions::default(),
            transport: None,
            publisher: Arc::new(NullPublisher),
            subscription: None,
            clock: Arc::new(SystemClock),
            event_target: None,
        }
    }

    /// 关节限位来源（必填）
    pub fn joint_limits(mut self, provider: Arc<dyn JointLimitProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// 舵机参数
    pub fn options(mut self, options: ServoOptions) -> Self {
        self.options = options;
        self
    }

    /// 设置引脚（覆盖 `options` 中的值）
    pub fn pin(mut self, pin: u32) -> Self {
        self.options.pin = Some(pin);
        self
    }

    /// 反向映射
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.options.reverse = reverse;
        self
    }

    /// PWM 传输（必填）
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: PwmTransport + Send + 'static,
    {
        self.transport = Some(Box::new(transport));
        self
    }

    /// 事件发布器（默认丢弃所有事件）
    pub fn publisher(mut self, publisher: Arc<dyn MotionPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// 订阅通道：从外部消息总线推送的命令
    ///
    /// 由独立的转发线程投入邮箱，与 `cast` / `call` 共享同一个队列。
    pub fn subscription(mut self, commands: Receiver<Command>) -> Self {
        self.subscription = Some(commands);
        self
    }

    /// 时钟（默认进程单调时钟）
    pub fn clock(mut self, clock: Arc<dyn MonotonicClock>) -> Self {
        self.clock = clock;
        self
    }

    /// 事件发布路径（默认 `actuator/<joint>`）
    pub fn event_target(mut self, target: EventTarget) -> Self {
        self.event_target = Some(target);
        self
    }

    /// 校验配置、初始化 PWM 并启动工作线程
    ///
    /// 任何一步失败都不会留下运行中的工作线程。
    ///
    /// # 错误
    ///
    /// - 缺少限位来源或传输：`ConfigError::InvalidOptions`
    /// - 关节校验失败：`JointNotFound` / `UnsupportedJointType` / `NoLimitsDefined` /
    ///   `MissingLimit` / `InvalidRange` / `InvalidVelocityLimit`
    /// - PWM 初始化失败：`ConfigError::Transport`
    pub fn build(self) -> Result<ServoProcessor, ConfigError> {
        let provider = self.provider.ok_or_else(|| {
            ConfigError::InvalidOptions("joint limit provider is required".to_string())
        })?;
        let mut transport = self
            .transport
            .ok_or_else(|| ConfigError::InvalidOptions("PWM transport is required".to_string()))?;

        let (calibration, state) =
            build_calibration(provider.as_ref(), &self.joint, &self.options, self.event_target)?;

        transport
            .set_frequency(state.pin, calibration.update_rate)
            .map_err(ConfigError::Transport)?;
        transport
            .set_pulse_width(state.pin, state.current_pulse)
            .map_err(ConfigError::Transport)?;

        let calibration = Arc::new(calibration);
        let shared = Arc::new(ArcSwap::from_pointee(state.clone()));
        let metrics = Arc::new(ServoMetrics::new());
        let capacity = self.options.mailbox_capacity;
        let (mailbox_tx, mailbox_rx) = bounded(capacity);

        let worker = Worker {
            executor: CommandExecutor::new(transport, self.publisher, self.clock, metrics.clone()),
            calibration: calibration.clone(),
            state: state.clone(),
            shared: shared.clone(),
            metrics: metrics.clone(),
            release_on_shutdown: self.options.release_on_shutdown,
        };

        let join = thread::Builder::new()
            .name(format!("rcservo-{}", self.joint))
            .spawn(move || command_loop(worker, mailbox_rx))
            .map_err(ConfigError::Spawn)?;

        let handle = ServoHandle::new(
            mailbox_tx.clone(),
            capacity,
            calibration.clone(),
            shared,
            metrics,
        );
        let mut processor = ServoProcessor::new(handle, join);

        if let Some(commands) = self.subscription {
            // 停止信号：从不发送，丢弃发送端即唤醒转发线程
            let (stop_tx, stop_rx) = bounded::<()>(0);
            let joint = self.joint.clone();
            // 失败时 processor 被丢弃，工作线程随之停止
            let forwarder = thread::Builder::new()
                .name(format!("rcservo-{}-sub", self.joint))
                .spawn(move || forward_subscription(joint, commands, mailbox_tx, stop_rx))
                .map_err(ConfigError::Spawn)?;
            processor.attach_forwarder(stop_tx, forwarder);
        }

        info!(
            "Servo processor for joint '{}' started on pin {} ({}Hz, {}-{}μs, center {:.4})",
            state.joint,
            state.pin,
            calibration.update_rate,
            calibration.min_pulse,
            calibration.max_pulse,
            calibration.center_angle
        );

        Ok(processor)
    }
}

/// 使用默认发布器、时钟，无订阅通道启动处理器
pub fn init<T>(
    provider: Arc<dyn JointLimitProvider>,
    joint: &str,
    options: ServoOptions,
    transport: T,
) -> Result<ServoProcessor, ConfigError>
where
    T: PwmTransport + Send + 'static,
{
    ServoBuilder::new(joint)
        .joint_limits(provider)
        .options(options)
        .transport(transport)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcservo_protocol::{JointDescriptor, JointLimits, JointType};
    use rcservo_pwm::{MockPwm, PwmCall};
    use std::collections::HashMap;

    fn joints() -> Arc<HashMap<String, JointDescriptor>> {
        let mut map = HashMap::new();
        map.insert(
            "shoulder".to_string(),
            JointDescriptor::revolute(JointLimits::new(0.0, 2.0, 1.0, 1.0)),
        );
        map.insert(
            "wheel".to_string(),
            JointDescriptor::new(JointType::Continuous, None),
        );
        Arc::new(map)
    }

    #[test]
    fn test_build_initializes_pwm() {
        let pwm = MockPwm::new();
        let servo = ServoBuilder::new("shoulder")
            .joint_limits(joints())
            .pin(4)
            .transport(pwm.clone())
            .build()
            .unwrap();

        assert_eq!(
            pwm.calls(),
            vec![
                PwmCall::Frequency { channel: 4, hz: 50.0 },
                PwmCall::PulseWidth {
                    channel: 4,
                    pulse_us: 1500
                },
            ]
        );
        assert_eq!(servo.state().current_angle, 1.0);
        assert_eq!(servo.calibration().center_angle, 1.0);
        assert!(servo.is_running());
    }

    #[test]
    fn test_build_requires_provider_and_transport() {
        let err = ServoBuilder::new("shoulder")
            .pin(1)
            .transport(MockPwm::new())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::InvalidOptions(_)));

        let err = ServoBuilder::new("shoulder")
            .joint_limits(joints())
            .pin(1)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::InvalidOptions(_)));
    }

    #[test]
    fn test_unsupported_joint_touches_no_hardware() {
        let pwm = MockPwm::new();
        let err = init(joints(), "wheel", ServoOptions::with_pin(1), pwm.clone())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::UnsupportedJointType { .. }));
        assert!(pwm.calls().is_empty());
    }

    #[test]
    fn test_frequency_failure_aborts_build() {
        let pwm = MockPwm::new();
        pwm.fail_frequency(true);
        let err = init(joints(), "shoulder", ServoOptions::with_pin(1), pwm.clone())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Transport(_)));
        assert!(pwm.calls().is_empty());
    }

    #[test]
    fn test_initial_pulse_failure_aborts_build() {
        let pwm = MockPwm::new();
        pwm.fail_pulse_width(true);
        let err = init(joints(), "shoulder", ServoOptions::with_pin(1), pwm.clone())
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Transport(_)));
        assert_eq!(pwm.pulse_write_count(), 0);
    }
}
