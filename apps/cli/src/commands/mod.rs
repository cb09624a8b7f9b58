//! 命令定义和实现

pub mod check;
pub mod info;
pub mod r#move;
pub mod sweep;

pub use check::CheckCommand;
pub use info::InfoCommand;
pub use r#move::MoveCommand;
pub use sweep::SweepCommand;
