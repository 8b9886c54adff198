//! # Xrdcal - 1D 探测器衍射仪几何标定工具箱
//!
//! 从 1D 探测器扫描中提取定量峰位，用于标定仪器几何：探测器的每像素角度
//! 校正、以及 X 射线光束相对测角仪旋转轴的水平/垂直偏移。
//!
//! ## 子命令
//! - `align-h` - 水平光束对准（ω 扫描）
//! - `align-v` - 垂直光束对准（χ 扫描）
//! - `calibrate` - 探测器像素-角度标定（直接入射扫描 → .CALI）
//! - `read-image` - 应用校正表并导出校正后的谱图
//! - `gonio-center` - 测角仪旋转中心拟合
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (.TTX / .CALI 格式读写)
//!   │     ├── fit/       (峰拟合与几何拟合)
//!   │     └── models/    (数据模型与配置)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod cli;
mod commands;
mod error;
mod fit;
mod models;
mod parsers;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
