//! # calibrate 子命令 CLI 定义
//!
//! 探测器标定：直接入射参考扫描 → 每像素角度校正表 (.CALI)。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/calibrate.rs`

use clap::Args;
use std::path::PathBuf;

use crate::models::DEFAULT_BACKGROUND_MARGIN;

/// 探测器标定参数
#[derive(Args, Debug)]
pub struct CalibrateArgs {
    /// Direct-incidence reference scan file (.TTX)
    #[arg(required_unless_present = "params")]
    pub scan: Option<PathBuf>,

    /// Output correction table file (.CALI)
    #[arg(short, long, default_value = "detector.CALI")]
    pub output: PathBuf,

    /// Acquisition numbers to remove before fitting (1-based), e.g. "2,5"
    #[arg(long, value_delimiter = ',')]
    pub remove: Vec<usize>,

    /// Save the filtered scan to this path (.TTX)
    #[arg(long)]
    pub save_clean: Option<PathBuf>,

    /// Background window size on each edge of the profile [pix]
    #[arg(long, default_value_t = DEFAULT_BACKGROUND_MARGIN)]
    pub background_margin: usize,

    /// Number of parallel fit jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Load the analysis configuration from a parameter snapshot file
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Save the effective configuration as a parameter snapshot file
    #[arg(long)]
    pub save_params: Option<PathBuf>,
}
