//! # read-image 子命令 CLI 定义
//!
//! 用 .CALI 校正表重映射一次扫描的角度与强度，导出校正后的谱图。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/image.rs`

use clap::Args;
use std::path::PathBuf;

/// 读图分析参数
#[derive(Args, Debug)]
pub struct ReadImageArgs {
    /// Input scan file (.TTX)
    #[arg(required_unless_present = "params")]
    pub scan: Option<PathBuf>,

    /// Correction table file (.CALI)
    #[arg(short, long, required_unless_present = "params")]
    pub calibration: Option<PathBuf>,

    /// Output CSV file for the corrected diagram
    #[arg(short, long, default_value = "diagram.csv")]
    pub output: PathBuf,

    /// Acquisition numbers to remove (1-based), e.g. "2,5"
    #[arg(long, value_delimiter = ',')]
    pub remove: Vec<usize>,

    /// Save the filtered scan to this path (.TTX)
    #[arg(long)]
    pub save_clean: Option<PathBuf>,

    /// Load the analysis configuration from a parameter snapshot file
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Save the effective configuration as a parameter snapshot file
    #[arg(long)]
    pub save_params: Option<PathBuf>,
}
