//! 关节信息命令

use crate::session::load_config;
use anyhow::Result;
use clap::Args;
use std::path::Path;

/// 关节信息命令参数
#[derive(Args, Debug)]
pub struct InfoCommand {
    /// 只列出可由舵机驱动的关节
    #[arg(long)]
    pub actuatable: bool,
}

impl InfoCommand {
    pub fn execute(&self, config_path: &Path) -> Result<()> {
        let config = load_config(config_path)?;
        let robot = &config.robot;
        let actuatable: Vec<&str> = robot.actuatable_joints().collect();

        if robot.name.is_empty() {
            println!("机器人: (未命名)");
        } else {
            println!("机器人: {}", robot.name);
        }

        for (name, joint) in &robot.joints {
            let usable = actuatable.contains(&name.as_str());
            if self.actuatable && !usable {
                continue;
            }

            let limits = match joint.limits {
                Some(l) => format!(
                    "[{}, {}] velocity {} effort {}",
                    fmt_bound(l.lower),
                    fmt_bound(l.upper),
                    l.velocity,
                    l.effort
                ),
                None => "no limits".to_string(),
            };
            let marker = if name == &config.servo.joint {
                "*"
            } else if usable {
                "+"
            } else {
                " "
            };
            println!("{} {:<16} {:<10} {}", marker, name, joint.joint_type.name(), limits);
        }
        Ok(())
    }
}

fn fmt_bound(bound: Option<f64>) -> String {
    bound.map_or_else(|| "-".to_string(), |v| format!("{}", v))
}
