//! 处理器 API 模块
//!
//! 提供对外的 `ServoProcessor`，封装工作线程和状态同步细节。

use crate::calibration::{Calibration, ProcessorState};
use crate::error::DriverError;
use crate::metrics::{MetricsSnapshot, ServoMetrics};
use crate::worker::{Acknowledged, Origin, Request};
use arc_swap::ArcSwap;
use crossbeam_channel::{Sender, TrySendError, bounded};
use rcservo_protocol::{CorrelationId, PositionCommand};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::error;

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // 看门狗线程负责 join，主线程带超时等待
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 处理器句柄（可克隆，可跨线程）
///
/// 所有命令都进入同一个邮箱，由工作线程顺序执行。
/// 句柄不会让工作线程保持运行：`ServoProcessor` 被丢弃后，
/// 通过句柄发送的命令返回 `ChannelClosed`。
#[derive(Clone)]
pub struct ServoHandle {
    mailbox: Sender<Request>,
    capacity: usize,
    calibration: Arc<Calibration>,
    state: Arc<ArcSwap<ProcessorState>>,
    metrics: Arc<ServoMetrics>,
}

impl ServoHandle {
    pub(crate) fn new(
        mailbox: Sender<Request>,
        capacity: usize,
        calibration: Arc<Calibration>,
        state: Arc<ArcSwap<ProcessorState>>,
        metrics: Arc<ServoMetrics>,
    ) -> Self {
        Self {
            mailbox,
            capacity,
            calibration,
            state,
            metrics,
        }
    }

    /// 同步执行位置命令（阻塞直到工作线程处理完毕）
    ///
    /// # 错误
    ///
    /// - `DriverError::Transport`: PWM 写入失败，状态未改变
    /// - `DriverError::ChannelClosed`: 处理器已停止
    pub fn call(&self, command: PositionCommand) -> Result<Acknowledged, DriverError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.mailbox
            .send(Request::Position {
                command,
                origin: Origin::Call,
                reply: Some(reply_tx),
            })
            .map_err(|_| DriverError::ChannelClosed)?;

        match reply_rx.recv() {
            Ok(result) => result.map_err(DriverError::from),
            Err(_) => Err(DriverError::ChannelClosed),
        }
    }

    /// 异步投递位置命令（非阻塞，不等待结果）
    ///
    /// 执行失败只会记录日志。
    ///
    /// # 错误
    ///
    /// - `DriverError::ChannelFull`: 邮箱已满
    /// - `DriverError::ChannelClosed`: 处理器已停止
    pub fn cast(&self, command: PositionCommand) -> Result<(), DriverError> {
        self.mailbox
            .try_send(Request::Position {
                command,
                origin: Origin::Cast,
                reply: None,
            })
            .map_err(|e| match e {
                TrySendError::Full(_) => {
                    self.metrics.mailbox_full.fetch_add(1, Ordering::Relaxed);
                    DriverError::ChannelFull(self.capacity)
                },
                TrySendError::Disconnected(_) => DriverError::ChannelClosed,
            })
    }

    /// 同步位置命令的便捷入口
    pub fn handle_position_command(
        &self,
        angle: f64,
        correlation_id: Option<CorrelationId>,
    ) -> Result<Acknowledged, DriverError> {
        self.call(PositionCommand {
            angle,
            correlation_id,
        })
    }

    /// 当前状态快照（无锁）
    pub fn state(&self) -> Arc<ProcessorState> {
        self.state.load_full()
    }

    /// 标定参数
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 邮箱中等待执行的命令数
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }
}

/// 舵机位置命令处理器
///
/// 由 [`ServoBuilder`](crate::ServoBuilder) 创建。丢弃时先停止订阅转发线程，
/// 再通知工作线程退出并等待（各最多 2 秒）。
pub struct ServoProcessor {
    handle: ServoHandle,
    worker: Option<JoinHandle<()>>,
    forwarder: Option<JoinHandle<()>>,
    stop_forwarder: Option<Sender<()>>,
}

impl ServoProcessor {
    pub(crate) fn new(handle: ServoHandle, worker: JoinHandle<()>) -> Self {
        Self {
            handle,
            worker: Some(worker),
            forwarder: None,
            stop_forwarder: None,
        }
    }

    pub(crate) fn attach_forwarder(&mut self, stop: Sender<()>, forwarder: JoinHandle<()>) {
        self.stop_forwarder = Some(stop);
        self.forwarder = Some(forwarder);
    }

    /// 获取可克隆的句柄
    pub fn handle(&self) -> ServoHandle {
        self.handle.clone()
    }

    /// 同步执行位置命令
    pub fn call(&self, command: PositionCommand) -> Result<Acknowledged, DriverError> {
        self.handle.call(command)
    }

    /// 异步投递位置命令
    pub fn cast(&self, command: PositionCommand) -> Result<(), DriverError> {
        self.handle.cast(command)
    }

    /// 同步执行位置命令
    pub fn handle_position_command(
        &self,
        angle: f64,
        correlation_id: Option<CorrelationId>,
    ) -> Result<Acknowledged, DriverError> {
        self.handle.handle_position_command(angle, correlation_id)
    }

    pub fn state(&self) -> Arc<ProcessorState> {
        self.handle.state()
    }

    pub fn calibration(&self) -> &Calibration {
        self.handle.calibration()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.handle.metrics()
    }

    /// 邮箱中等待执行的命令数
    pub fn pending(&self) -> usize {
        self.handle.pending()
    }

    /// 工作线程是否仍在运行
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// 停止处理器并等待工作线程退出
    ///
    /// 邮箱中已排队的命令会先执行完。
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let join_timeout = Duration::from_secs(2);

        // 先停转发线程，保证 Shutdown 之后不再有订阅命令入队
        drop(self.stop_forwarder.take());
        if let Some(forwarder) = self.forwarder.take() {
            if let Err(_e) = forwarder.join_timeout(join_timeout) {
                error!(
                    "Subscription forwarder for joint '{}' failed to stop within {:?}",
                    self.handle.state().joint,
                    join_timeout
                );
            }
        }

        let Some(worker) = self.worker.take() else {
            return;
        };

        // 工作线程已退出时发送失败，直接 join
        let _ = self.handle.mailbox.send(Request::Shutdown);

        if let Err(_e) = worker.join_timeout(join_timeout) {
            error!(
                "Servo worker for joint '{}' panicked or failed to shut down within {:?}",
                self.handle.state().joint,
                join_timeout
            );
        }
    }
}

impl Drop for ServoProcessor {
    fn drop(&mut self) {
        self.stop();
    }
}
