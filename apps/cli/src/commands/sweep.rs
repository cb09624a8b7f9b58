//! 扫动命令
//!
//! 在关节范围内往复发送位置命令（异步投递），Ctrl+C 停止。

use crate::session::{TransportArgs, load_config, start};
use anyhow::{Context, Result};
use clap::Args;
use rcservo_driver::{DriverError, MotionEventBus};
use rcservo_protocol::{EventTarget, PositionCommand};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::warn;

/// 扫动命令参数
#[derive(Args, Debug)]
pub struct SweepCommand {
    /// 起点（默认关节下限）
    #[arg(long, allow_hyphen_values = true)]
    pub from: Option<f64>,

    /// 终点（默认关节上限）
    #[arg(long, allow_hyphen_values = true)]
    pub to: Option<f64>,

    /// 步长（> 0）
    #[arg(long, default_value_t = 0.05)]
    pub step: f64,

    /// 命令间隔（毫秒）
    #[arg(long, default_value_t = 20)]
    pub interval_ms: u64,

    /// 往复次数（0 表示直到 Ctrl+C）
    #[arg(long, default_value_t = 1)]
    pub cycles: u32,

    /// 打印每条运动事件
    #[arg(long)]
    pub events: bool,

    #[command(flatten)]
    pub transport: TransportArgs,
}

impl SweepCommand {
    pub fn execute(&self, config_path: &Path) -> Result<()> {
        let config = load_config(config_path)?;
        let bus = Arc::new(MotionEventBus::new());
        let events = bus.subscribe(EventTarget::default());
        let servo = start(&config, &self.transport, bus.clone())?;

        let cal = servo.calibration();
        let from = self.from.unwrap_or(cal.lower_limit);
        let to = self.to.unwrap_or(cal.upper_limit);
        let forward = sweep_points(from, to, self.step)?;
        let mut backward = forward.clone();
        backward.reverse();

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nReceived interrupt signal. Stopping sweep...");
            stop_flag.store(true, Ordering::SeqCst);
        })
        .context("设置 Ctrl+C 处理失败")?;

        let interval = Duration::from_millis(self.interval_ms);
        let mut next_tick = Instant::now();
        let mut cycle = 0u32;
        let mut rejected = 0u64;

        'sweep: while self.cycles == 0 || cycle < self.cycles {
            for &angle in forward.iter().chain(backward.iter().skip(1)) {
                if stop.load(Ordering::SeqCst) {
                    break 'sweep;
                }

                match servo.cast(PositionCommand::new(angle)) {
                    Ok(()) => {},
                    Err(DriverError::ChannelFull(capacity)) => {
                        rejected += 1;
                        warn!("Mailbox full (capacity {}), skipping {}", capacity, angle);
                    },
                    Err(e) => return Err(e).context("位置命令投递失败"),
                }

                if self.events {
                    for published in events.try_iter() {
                        println!("{}", serde_json::to_string(&published.event)?);
                    }
                }

                next_tick += interval;
                let now = Instant::now();
                if next_tick > now {
                    spin_sleep::sleep(next_tick - now);
                } else {
                    next_tick = now;
                }
            }
            cycle += 1;
        }

        // 句柄在处理器停止后仍可读取最终状态（排队的命令已执行完）
        let handle = servo.handle();
        servo.shutdown();
        let state = handle.state();
        let metrics = handle.metrics();

        if self.events {
            for published in events.try_iter() {
                println!("{}", serde_json::to_string(&published.event)?);
            }
        }

        eprintln!(
            "Sweep finished: {} cycles, {} commands applied, {} rejected, final position {:.4}",
            cycle, metrics.commands_applied, rejected, state.current_angle
        );
        Ok(())
    }
}

/// 单程最多的位置点数
pub const MAX_SWEEP_POINTS: usize = 10_000;

/// 从 `from` 到 `to` 按步长生成位置序列（包含两个端点）
///
/// 端点必须是有限值，步长必须为正，点数不超过 [`MAX_SWEEP_POINTS`]。
pub fn sweep_points(from: f64, to: f64, step: f64) -> Result<Vec<f64>> {
    if !(from.is_finite() && to.is_finite()) {
        anyhow::bail!("扫动端点必须为有限值: {} -> {}", from, to);
    }
    if !(step.is_finite() && step > 0.0) {
        anyhow::bail!("步长必须为正数: {}", step);
    }

    let distance = (to - from).abs();
    let direction = if to >= from { 1.0 } else { -1.0 };
    let steps = (distance / step).floor();
    if !steps.is_finite() || steps >= MAX_SWEEP_POINTS as f64 {
        anyhow::bail!(
            "步长 {} 过小：{} -> {} 需要超过 {} 个点",
            step,
            from,
            to,
            MAX_SWEEP_POINTS
        );
    }
    let steps = steps as usize;

    let mut points: Vec<f64> = (0..=steps)
        .map(|i| from + direction * step * i as f64)
        .collect();
    if points.last().is_some_and(|&last| (last - to).abs() > 1e-9) {
        points.push(to);
    }
    Ok(points)
}
