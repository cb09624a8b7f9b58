//! 校验命令
//!
//! 执行完整的配置校验并打印标定结果，不访问硬件。

use crate::session::load_config;
use anyhow::{Context, Result};
use clap::Args;
use rcservo_driver::build_calibration;
use std::path::Path;

/// 校验命令参数
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

impl CheckCommand {
    pub fn execute(&self, config_path: &Path) -> Result<()> {
        let config = load_config(config_path)?;
        let (cal, state) = build_calibration(
            &config.robot,
            &config.servo.joint,
            &config.servo.to_options(),
            Some(config.servo.event_target()),
        )
        .with_context(|| format!("关节 '{}' 的配置无效", config.servo.joint))?;

        if self.json {
            let report = serde_json::json!({
                "joint": state.joint,
                "pin": state.pin,
                "event_target": state.event_target,
                "lower_limit": cal.lower_limit,
                "upper_limit": cal.upper_limit,
                "center_angle": cal.center_angle,
                "velocity_limit": cal.velocity_limit,
                "min_pulse": cal.min_pulse,
                "max_pulse": cal.max_pulse,
                "reverse": cal.reverse,
                "update_rate": cal.update_rate,
                "initial_pulse": state.current_pulse,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("✅ 配置有效: {}", config_path.display());
        println!("  关节:     {} (pin {})", state.joint, state.pin);
        println!("  事件路径: {}", state.event_target);
        println!(
            "  位置范围: [{:.4}, {:.4}]，中心 {:.4}",
            cal.lower_limit, cal.upper_limit, cal.center_angle
        );
        println!("  最大速度: {}", cal.velocity_limit);
        println!(
            "  脉宽范围: {}-{}μs{}，初始 {}μs",
            cal.min_pulse,
            cal.max_pulse,
            if cal.reverse { "（反向）" } else { "" },
            state.current_pulse
        );
        println!(
            "  刷新频率: {}Hz（周期 {:.0}μs）",
            cal.update_rate,
            cal.period_us()
        );
        Ok(())
    }
}
