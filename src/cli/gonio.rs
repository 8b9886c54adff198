//! # gonio-center 子命令 CLI 定义
//!
//! 测角仪旋转中心拟合：比较仪在若干旋转角下的读数 → 偏心距与轴向偏移。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/gonio.rs`

use clap::Args;
use std::path::PathBuf;

/// 旋转中心分析参数
#[derive(Args, Debug)]
pub struct GonioArgs {
    /// CSV data file with an "angle,reading" header, angles in deg, readings
    /// in mm. Uses the built-in measured dataset when omitted
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Comparator tip radius (not diameter) [mm]
    #[arg(long, default_value_t = 0.515)]
    pub rtip: f64,

    /// Maximum allowed eccentricity magnitude [mm]
    #[arg(long, default_value_t = 10.0)]
    pub e_max: f64,

    /// Maximum allowed axial offset magnitude [mm]
    #[arg(long, default_value_t = 20.0)]
    pub z0_max: f64,

    /// Load the analysis configuration from a parameter snapshot file
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Save the effective configuration as a parameter snapshot file
    #[arg(long)]
    pub save_params: Option<PathBuf>,
}
