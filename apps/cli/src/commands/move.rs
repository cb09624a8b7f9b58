//! 移动命令
//!
//! 启动处理器，执行一条同步位置命令，输出运动事件。

use crate::session::{TransportArgs, load_config, start};
use anyhow::{Context, Result};
use clap::Args;
use rcservo_driver::{NullPublisher, monotonic_ms};
use rcservo_protocol::CorrelationId;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// 移动命令参数
#[derive(Args, Debug)]
pub struct MoveCommand {
    /// 目标位置（rad 或 m），超出范围时钳位
    #[arg(allow_hyphen_values = true)]
    pub angle: f64,

    /// 关联 ID（写入运动事件）
    #[arg(long)]
    pub correlation_id: Option<u64>,

    /// 等待到预计到达时间后再退出
    #[arg(long)]
    pub wait: bool,

    #[command(flatten)]
    pub transport: TransportArgs,
}

impl MoveCommand {
    pub fn execute(&self, config_path: &Path) -> Result<()> {
        let config = load_config(config_path)?;
        let servo = start(&config, &self.transport, Arc::new(NullPublisher))?;

        let ack = servo
            .handle_position_command(self.angle, self.correlation_id.map(CorrelationId::new))
            .context("位置命令执行失败")?;

        let output = serde_json::json!({
            "joint": config.servo.joint,
            "pulse_us": ack.pulse_us,
            "event": ack.event,
        });
        println!("{}", serde_json::to_string(&output)?);

        if self.wait {
            let remaining = ack.event.expected_arrival - monotonic_ms();
            if remaining > 0 {
                spin_sleep::sleep(Duration::from_millis(remaining as u64));
            }
        }

        servo.shutdown();
        Ok(())
    }
}
