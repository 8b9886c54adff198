//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `models/`, `fit/`, `utils/`
//! - 子模块: align, calibrate, gonio, image

pub mod align;
pub mod calibrate;
pub mod gonio;
pub mod image;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::AlignH(args) => align::execute_horizontal(args),
        Commands::AlignV(args) => align::execute_vertical(args),
        Commands::Calibrate(args) => calibrate::execute(args),
        Commands::ReadImage(args) => image::execute(args),
        Commands::GonioCenter(args) => gonio::execute(args),
    }
}
