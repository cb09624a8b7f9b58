//! 运动事件发布
//!
//! 处理器在每条命令成功后发布一条 [`MotionEvent`]。发布是尽力而为的：
//! 结果不影响命令成功与否，也不会阻塞工作线程。
//!
//! # 使用示例
//!
//! ```rust
//! use rcservo_driver::publisher::{MotionEventBus, MotionPublisher};
//! use rcservo_protocol::{CommandType, EventTarget, MotionEvent};
//!
//! let bus = MotionEventBus::new();
//! let rx = bus.subscribe(EventTarget::new(["actuator"]));
//!
//! let event = MotionEvent {
//!     initial_position: 0.0,
//!     target_position: 0.5,
//!     expected_arrival: 500,
//!     command_type: CommandType::Position,
//!     correlation_id: None,
//! };
//! bus.publish(&EventTarget::actuator("shoulder"), &event);
//!
//! let received = rx.try_recv().unwrap();
//! assert_eq!(received.event, event);
//! ```

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::RwLock;
use rcservo_protocol::{EventTarget, MotionEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{trace, warn};

/// 事件发布接口
///
/// # 性能要求
///
/// 在工作线程中同步调用，实现必须非阻塞（推荐 `try_send`）。
pub trait MotionPublisher: Send + Sync {
    fn publish(&self, target: &EventTarget, event: &MotionEvent);
}

impl<P: MotionPublisher + ?Sized> MotionPublisher for Arc<P> {
    fn publish(&self, target: &EventTarget, event: &MotionEvent) {
        (**self).publish(target, event)
    }
}

/// 丢弃所有事件
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl MotionPublisher for NullPublisher {
    fn publish(&self, _target: &EventTarget, _event: &MotionEvent) {}
}

/// 带发布路径的事件
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub target: EventTarget,
    pub event: MotionEvent,
}

struct Subscriber {
    prefix: EventTarget,
    tx: Sender<PublishedEvent>,
    /// 接收端已被丢弃
    disconnected: AtomicBool,
}

/// 进程内事件总线
///
/// 订阅方按路径前缀订阅，每个订阅方一个有界队列：
/// - 队列满时丢弃事件并计数，不阻塞发布方
/// - 接收端被丢弃的订阅方在下一次发布时移除
#[derive(Default)]
pub struct MotionEventBus {
    subscribers: RwLock<Vec<Subscriber>>,
    dropped_events: AtomicU64,
}

impl MotionEventBus {
    /// 默认每个订阅方的队列容量
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅 `prefix` 下的所有事件（空路径订阅全部）
    pub fn subscribe(&self, prefix: EventTarget) -> Receiver<PublishedEvent> {
        self.subscribe_with_capacity(prefix, Self::DEFAULT_CAPACITY)
    }

    pub fn subscribe_with_capacity(
        &self,
        prefix: EventTarget,
        capacity: usize,
    ) -> Receiver<PublishedEvent> {
        let (tx, rx) = bounded(capacity.max(1));
        self.subscribers.write().push(Subscriber {
            prefix,
            tx,
            disconnected: AtomicBool::new(false),
        });
        rx
    }

    /// 当前订阅方数量
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// 因队列满而丢弃的事件数
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }
}

impl MotionPublisher for MotionEventBus {
    fn publish(&self, target: &EventTarget, event: &MotionEvent) {
        let mut has_disconnected = false;

        {
            let subscribers = self.subscribers.read();
            for sub in subscribers.iter().filter(|s| target.starts_with(&s.prefix)) {
                let published = PublishedEvent {
                    target: target.clone(),
                    event: *event,
                };
                match sub.tx.try_send(published) {
                    Ok(()) => {},
                    Err(TrySendError::Full(_)) => {
                        self.dropped_events.fetch_add(1, Ordering::Relaxed);
                        warn!("Motion event subscriber '{}' is full, event dropped", sub.prefix);
                    },
                    Err(TrySendError::Disconnected(_)) => {
                        sub.disconnected.store(true, Ordering::Relaxed);
                        has_disconnected = true;
                    },
                }
            }
        }

        if has_disconnected {
            let mut subscribers = self.subscribers.write();
            subscribers.retain(|s| {
                let alive = !s.disconnected.load(Ordering::Relaxed);
                if !alive {
                    trace!("Removing disconnected motion event subscriber '{}'", s.prefix);
                }
                alive
            });
        }
    }
}
