//! 处理器端到端集成测试
//!
//! 使用 MockPwm、ManualClock 和 MotionEventBus，验证三种投递方式下的完整流程。

use crossbeam_channel::{Receiver, Sender, bounded};
use rcservo_driver::*;
use rcservo_protocol::{
    Command, CorrelationId, EventTarget, JointDescriptor, JointLimits, JointType,
    PositionCommand,
};
use rcservo_pwm::{MockPwm, PwmError, PwmTransport};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

struct Rig {
    servo: ServoProcessor,
    pwm: MockPwm,
    clock: Arc<ManualClock>,
    events: Receiver<PublishedEvent>,
    bus: Arc<MotionEventBus>,
}

fn joint_map(lower: f64, upper: f64, velocity: f64) -> Arc<HashMap<String, JointDescriptor>> {
    let mut joints = HashMap::new();
    joints.insert(
        "shoulder".to_string(),
        JointDescriptor::revolute(JointLimits::new(lower, upper, velocity, 1.0)),
    );
    joints.insert(
        "wheel".to_string(),
        JointDescriptor::new(JointType::Continuous, None),
    );
    Arc::new(joints)
}

fn rig_with(
    lower: f64,
    upper: f64,
    velocity: f64,
    options: ServoOptions,
    subscription: Option<Receiver<Command>>,
) -> Rig {
    let pwm = MockPwm::new();
    let clock = Arc::new(ManualClock::new(10_000));
    let bus = Arc::new(MotionEventBus::new());
    let events = bus.subscribe(EventTarget::default());

    let mut builder = ServoBuilder::new("shoulder")
        .joint_limits(joint_map(lower, upper, velocity))
        .options(options)
        .transport(pwm.clone())
        .publisher(bus.clone())
        .clock(clock.clone());
    if let Some(rx) = subscription {
        builder = builder.subscription(rx);
    }

    Rig {
        servo: builder.build().unwrap(),
        pwm,
        clock,
        events,
        bus,
    }
}

fn rig(lower: f64, upper: f64, velocity: f64) -> Rig {
    rig_with(lower, upper, velocity, ServoOptions::with_pin(17), None)
}

#[test]
fn test_quarter_turn_endpoints() {
    let rig = rig(-0.7854, 0.7854, 1.0);

    assert_eq!(rig.servo.handle_position_command(0.0, None).unwrap().pulse_us, 1500);
    assert_eq!(rig.servo.handle_position_command(-0.7854, None).unwrap().pulse_us, 500);
    assert_eq!(rig.servo.handle_position_command(0.7854, None).unwrap().pulse_us, 2500);
    assert_eq!(rig.pwm.last_pulse(17), Some(2500));
}

#[test]
fn test_travel_time_from_center() {
    let rig = rig(-1.0, 1.0, 1.0);

    let ack = rig.servo.handle_position_command(1.0, None).unwrap();
    assert_eq!(ack.event.initial_position, 0.0);
    assert_eq!(ack.event.target_position, 1.0);
    assert_eq!(ack.event.expected_arrival, 10_000 + 1_000);

    let published = rig.events.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(published.target, EventTarget::actuator("shoulder"));
    assert_eq!(published.event, ack.event);
}

#[test]
fn test_repeated_target_is_idempotent() {
    let rig = rig(-1.0, 1.0, 2.0);

    rig.servo.handle_position_command(0.4, None).unwrap();
    rig.clock.advance(500);
    let ack = rig.servo.handle_position_command(0.4, None).unwrap();

    assert_eq!(ack.event.initial_position, 0.4);
    assert_eq!(ack.event.expected_arrival, rig.clock.now_ms());
    assert!(ack.event.is_stationary());
}

#[test]
fn test_out_of_range_is_clamped() {
    let rig = rig(-1.0, 1.0, 1.0);

    let ack = rig.servo.handle_position_command(5.0, None).unwrap();
    assert_eq!(ack.event.target_position, 1.0);
    assert_eq!(ack.pulse_us, 2500);
    assert_eq!(rig.servo.state().current_angle, 1.0);
    assert_eq!(rig.servo.metrics().commands_clamped, 1);
}

#[test]
fn test_center_of_asymmetric_limits() {
    let rig = rig(0.0, 2.0, 1.0);

    assert_eq!(rig.servo.calibration().center_angle, 1.0);
    assert_eq!(rig.servo.state().current_angle, 1.0);
    assert_eq!(rig.servo.state().current_pulse, 1500);
}

#[test]
fn test_reverse_mapping() {
    let options = ServoOptions {
        reverse: true,
        ..ServoOptions::with_pin(17)
    };
    let rig = rig_with(-1.0, 1.0, 1.0, options, None);

    assert_eq!(rig.servo.handle_position_command(-1.0, None).unwrap().pulse_us, 2500);
    assert_eq!(rig.servo.handle_position_command(1.0, None).unwrap().pulse_us, 500);
    assert_eq!(rig.servo.calibration().center_angle, 0.0);
}

#[test]
fn test_correlation_id_propagates() {
    let rig = rig(-1.0, 1.0, 1.0);
    let id = CorrelationId::next();

    let ack = rig.servo.handle_position_command(0.2, Some(id)).unwrap();
    assert_eq!(ack.event.correlation_id, Some(id));
}

#[test]
fn test_transport_failure_keeps_state() {
    let rig = rig(-1.0, 1.0, 1.0);
    rig.servo.handle_position_command(0.5, None).unwrap();
    let _ = rig.events.recv_timeout(Duration::from_secs(1)).unwrap();

    rig.pwm.fail_next_pulse_writes(1);
    let err = rig.servo.handle_position_command(-0.5, None).unwrap_err();
    assert!(matches!(err, DriverError::Transport(_)));
    assert!(err.is_retryable());

    let state = rig.servo.state();
    assert_eq!(state.current_angle, 0.5);
    assert_eq!(rig.pwm.last_pulse(17), Some(state.current_pulse));
    assert!(rig.events.try_recv().is_err());

    // 失败不影响后续命令
    let ack = rig.servo.handle_position_command(-0.5, None).unwrap();
    assert_eq!(ack.event.initial_position, 0.5);
    assert_eq!(rig.servo.metrics().transport_failures, 1);
}

#[test]
fn test_cast_is_processed_in_order() {
    let rig = rig(-1.0, 1.0, 1.0);

    for angle in [0.1, 0.2, 0.3] {
        rig.servo.cast(PositionCommand::new(angle)).unwrap();
    }
    // 同步调用排在异步命令之后，返回时前面的命令都已执行
    let ack = rig.servo.handle_position_command(0.4, None).unwrap();
    assert!((ack.event.initial_position - 0.3).abs() < 1e-12);

    let targets: Vec<f64> = rig
        .events
        .try_iter()
        .map(|e| e.event.target_position)
        .collect();
    assert_eq!(targets, vec![0.1, 0.2, 0.3, 0.4]);
}

#[test]
fn test_cast_failure_is_dropped() {
    let rig = rig(-1.0, 1.0, 1.0);
    rig.pwm.fail_next_pulse_writes(1);

    rig.servo.cast(PositionCommand::new(0.9)).unwrap();
    let ack = rig.servo.handle_position_command(0.1, None).unwrap();

    assert_eq!(ack.event.initial_position, 0.0);
    let metrics = rig.servo.metrics();
    assert_eq!(metrics.commands_received, 2);
    assert_eq!(metrics.commands_applied, 1);
}

#[test]
fn test_subscription_commands() {
    let (tx, rx) = bounded(8);
    let rig = rig_with(-1.0, 1.0, 1.0, ServoOptions::with_pin(3), Some(rx));

    tx.send(Command::position(0.25)).unwrap();
    let published = rig.events.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(published.event.target_position, 0.25);

    // 订阅通道关闭后直接调用仍然可用
    drop(tx);
    let ack = rig.servo.handle_position_command(-0.25, None).unwrap();
    assert_eq!(ack.event.initial_position, 0.25);
}

#[test]
fn test_handle_outlives_processor() {
    let rig = rig(-1.0, 1.0, 1.0);
    let handle = rig.servo.handle();
    handle.handle_position_command(0.3, None).unwrap();
    assert_eq!(handle.state().current_angle, 0.3);

    rig.servo.shutdown();
    assert!(matches!(
        handle.handle_position_command(0.1, None),
        Err(DriverError::ChannelClosed)
    ));
    assert!(matches!(
        handle.cast(PositionCommand::new(0.1)),
        Err(DriverError::ChannelClosed)
    ));
}

#[test]
fn test_release_on_shutdown() {
    let options = ServoOptions {
        release_on_shutdown: true,
        ..ServoOptions::with_pin(9)
    };
    let rig = rig_with(-1.0, 1.0, 1.0, options, None);
    rig.servo.handle_position_command(0.5, None).unwrap();

    drop(rig.servo);
    assert_eq!(rig.pwm.last_pulse(9), Some(0));
}

#[test]
fn test_unsupported_joint_rejected() {
    let pwm = MockPwm::new();
    let err = ServoBuilder::new("wheel")
        .joint_limits(joint_map(-1.0, 1.0, 1.0))
        .pin(1)
        .transport(pwm.clone())
        .build()
        .err()
        .unwrap();

    assert!(matches!(err, ConfigError::UnsupportedJointType { .. }));
    assert!(err.is_joint_error());
    assert!(pwm.calls().is_empty());
}

#[test]
fn test_unknown_joint_rejected() {
    let err = init(
        joint_map(-1.0, 1.0, 1.0),
        "elbow",
        ServoOptions::with_pin(1),
        MockPwm::new(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, ConfigError::JointNotFound(name) if name == "elbow"));
}

#[test]
fn test_custom_event_target() {
    let bus = Arc::new(MotionEventBus::new());
    let arm = bus.subscribe(EventTarget::new(["arm"]));
    let servo = ServoBuilder::new("shoulder")
        .joint_limits(joint_map(-1.0, 1.0, 1.0))
        .pin(2)
        .transport(MockPwm::new())
        .publisher(bus.clone())
        .event_target(EventTarget::new(["arm", "left", "shoulder"]))
        .build()
        .unwrap();

    servo.handle_position_command(0.5, None).unwrap();
    let published = arm.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(published.target.to_string(), "arm/left/shoulder");
}

#[test]
fn test_full_subscriber_does_not_fail_commands() {
    let rig = rig(-1.0, 1.0, 1.0);
    let tiny = rig.bus.subscribe_with_capacity(EventTarget::default(), 1);

    rig.servo.handle_position_command(0.1, None).unwrap();
    rig.servo.handle_position_command(0.2, None).unwrap();

    assert_eq!(rig.bus.dropped_events(), 1);
    assert_eq!(tiny.len(), 1);
    assert_eq!(rig.servo.state().current_angle, 0.2);
}

/// 可在下一次脉宽写入时挡住工作线程的传输
struct GatedPwm {
    inner: MockPwm,
    armed: Arc<AtomicBool>,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl PwmTransport for GatedPwm {
    fn set_frequency(&mut self, channel: u32, hz: f64) -> Result<(), PwmError> {
        self.inner.set_frequency(channel, hz)
    }

    fn set_pulse_width(&mut self, channel: u32, pulse_us: u32) -> Result<(), PwmError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            let _ = self.entered.send(());
            let _ = self.release.recv_timeout(Duration::from_secs(5));
        }
        self.inner.set_pulse_width(channel, pulse_us)
    }
}

fn wait_for_pending(servo: &ServoProcessor, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while servo.pending() < expected {
        assert!(
            Instant::now() < deadline,
            "mailbox never reached {} pending commands (now {})",
            expected,
            servo.pending()
        );
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_interleaved_sources_keep_arrival_order() {
    let armed = Arc::new(AtomicBool::new(false));
    let (entered_tx, entered_rx) = bounded(1);
    let (release_tx, release_rx) = bounded(1);
    let pwm = MockPwm::new();
    let bus = Arc::new(MotionEventBus::new());
    let events = bus.subscribe(EventTarget::default());
    let (sub_tx, sub_rx) = bounded(8);

    let servo = ServoBuilder::new("shoulder")
        .joint_limits(joint_map(-1.0, 1.0, 1.0))
        .pin(5)
        .transport(GatedPwm {
            inner: pwm.clone(),
            armed: armed.clone(),
            entered: entered_tx,
            release: release_rx,
        })
        .publisher(bus.clone())
        .subscription(sub_rx)
        .clock(Arc::new(ManualClock::new(0)))
        .build()
        .unwrap();

    // 工作线程卡在第一条命令的 PWM 写入中
    armed.store(true, Ordering::SeqCst);
    servo.cast(PositionCommand::new(0.1)).unwrap();
    entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();

    sub_tx.send(Command::position(0.5)).unwrap();
    wait_for_pending(&servo, 1);
    servo.cast(PositionCommand::new(0.9)).unwrap();
    wait_for_pending(&servo, 2);

    let handle = servo.handle();
    let caller = thread::spawn(move || handle.handle_position_command(0.3, None));
    wait_for_pending(&servo, 3);

    release_tx.send(()).unwrap();
    let ack = caller.join().unwrap().unwrap();
    assert_eq!(ack.event.initial_position, 0.9);

    let targets: Vec<f64> = events.try_iter().map(|e| e.event.target_position).collect();
    assert_eq!(targets, vec![0.1, 0.5, 0.9, 0.3]);
    assert_eq!(pwm.last_pulse(5), Some(1800));
    assert_eq!(servo.state().current_angle, 0.3);
}

#[test]
fn test_shutdown_with_open_subscription() {
    let (tx, rx) = bounded(8);
    let rig = rig_with(-1.0, 1.0, 1.0, ServoOptions::with_pin(3), Some(rx));

    tx.send(Command::position(0.5)).unwrap();
    rig.events.recv_timeout(Duration::from_secs(1)).unwrap();

    let started = Instant::now();
    rig.servo.shutdown();
    assert!(started.elapsed() < Duration::from_secs(2));

    // 转发线程退出后订阅通道的接收端已被丢弃
    assert!(tx.send(Command::position(0.1)).is_err());
}
