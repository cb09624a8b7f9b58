//! 命令工作线程
//!
//! 每个处理器一个工作线程，顺序处理三种来源的位置命令：
//!
//! - 订阅通道（`Receiver<Command>`，外部消息总线推送，经转发线程进入邮箱）
//! - 异步投递（`cast`，不等待结果）
//! - 同步调用（`call`，等待确认或错误）
//!
//! 三种来源共用一个邮箱，工作线程只读邮箱：命令按进入邮箱的顺序逐条执行，
//! 状态更新对后续命令立即可见。

use crate::calibration::{Calibration, ProcessorState};
use crate::executor::CommandExecutor;
use crate::metrics::ServoMetrics;
use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender, select};
use rcservo_protocol::{Command, MotionEvent, PositionCommand};
use rcservo_pwm::{PwmError, PwmTransport};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, trace, warn};

/// 命令来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// 订阅通道
    Subscription,
    /// 异步投递
    Cast,
    /// 同步调用
    Call,
}

/// 同步调用的确认
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Acknowledged {
    /// 已发布的运动事件
    pub event: MotionEvent,
    /// 写入的脉宽（μs）
    pub pulse_us: u32,
}

pub(crate) type Reply = Sender<Result<Acknowledged, PwmError>>;

/// 邮箱消息
pub(crate) enum Request {
    Position {
        command: PositionCommand,
        origin: Origin,
        reply: Option<Reply>,
    },
    Shutdown,
}

pub(crate) type BoxedTransport = Box<dyn PwmTransport + Send>;

/// 工作线程持有的全部状态
pub(crate) struct Worker {
    pub executor: CommandExecutor<BoxedTransport>,
    pub calibration: Arc<Calibration>,
    pub state: ProcessorState,
    pub shared: Arc<ArcSwap<ProcessorState>>,
    pub metrics: Arc<ServoMetrics>,
    pub release_on_shutdown: bool,
}

impl Worker {
    fn handle(&mut self, command: PositionCommand, origin: Origin, reply: Option<Reply>) {
        self.metrics.commands_received.fetch_add(1, Ordering::Relaxed);
        trace!(
            "Joint '{}': {:?} command to {}",
            self.state.joint, origin, command.angle
        );

        match self.executor.execute(&self.calibration, &self.state, command) {
            Ok((next, event)) => {
                let pulse_us = next.current_pulse;
                self.state = next;
                self.shared.store(Arc::new(self.state.clone()));
                if let Some(reply) = reply {
                    // 调用方可能已放弃等待
                    let _ = reply.send(Ok(Acknowledged { event, pulse_us }));
                }
            },
            Err(e) => match reply {
                Some(reply) => {
                    let _ = reply.send(Err(e));
                },
                None => {
                    warn!(
                        "Joint '{}': {:?} command to {} dropped: {}",
                        self.state.joint, origin, command.angle, e
                    );
                },
            },
        }
    }

    fn finish(mut self) {
        if self.release_on_shutdown {
            match self.executor.release(self.state.pin) {
                Ok(()) => debug!("Joint '{}': pin {} released", self.state.joint, self.state.pin),
                Err(e) => error!(
                    "Joint '{}': failed to release pin {}: {}",
                    self.state.joint, self.state.pin, e
                ),
            }
        }
        info!("Servo processor for joint '{}' stopped", self.state.joint);
    }
}

/// 工作线程主循环
///
/// 收到 `Shutdown` 或所有邮箱发送端都被丢弃时退出。
pub(crate) fn command_loop(mut worker: Worker, mailbox: Receiver<Request>) {
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => info!("Servo worker priority set to MAX (realtime)"),
            Err(e) => warn!(
                "Failed to set servo worker priority: {}. \
                On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                e
            ),
        }
    }

    loop {
        match mailbox.recv() {
            Ok(Request::Position {
                command,
                origin,
                reply,
            }) => worker.handle(command, origin, reply),
            Ok(Request::Shutdown) => {
                trace!("Joint '{}': shutdown requested", worker.state.joint);
                break;
            },
            Err(_) => {
                trace!("Joint '{}': mailbox disconnected", worker.state.joint);
                break;
            },
        }
    }

    worker.finish();
}

/// 订阅转发线程
///
/// 把订阅通道的命令投入邮箱，与 `cast` / `call` 排在同一个队列中。
/// 邮箱满时阻塞（背压传给订阅通道）。订阅通道关闭、邮箱关闭或
/// `stop` 的发送端被丢弃时退出。
pub(crate) fn forward_subscription(
    joint: String,
    commands: Receiver<Command>,
    mailbox: Sender<Request>,
    stop: Receiver<()>,
) {
    loop {
        let command = select! {
            recv(commands) -> msg => match msg {
                Ok(Command::Position(command)) => command,
                Err(_) => {
                    debug!("Joint '{}': command subscription closed", joint);
                    return;
                },
            },
            recv(stop) -> _ => return,
        };

        let request = Request::Position {
            command,
            origin: Origin::Subscription,
            reply: None,
        };
        select! {
            send(mailbox, request) -> sent => {
                if sent.is_err() {
                    trace!("Joint '{}': mailbox closed, subscription forwarder exiting", joint);
                    return;
                }
            },
            recv(stop) -> _ => return,
        }
    }
}
