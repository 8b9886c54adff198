//! # 光束对准子命令 CLI 定义
//!
//! `align-h`（ω 扫描，水平偏移）与 `align-v`（χ 扫描，垂直偏移）共用同一组
//! 参数：扫描文件、峰窗口、背景子窗口、要剔除的采集等。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/align.rs`

use clap::Args;
use std::path::PathBuf;

use crate::error::{Result, XrdcalError};
use crate::models::DEFAULT_PIXEL_SIZE_MM;

/// 光束对准分析参数
#[derive(Args, Debug)]
pub struct AlignArgs {
    /// Input scan file (.TTX)
    #[arg(required_unless_present = "params")]
    pub scan: Option<PathBuf>,

    /// Peak fit window as a 1-based inclusive pixel range, e.g. "120-200".
    /// Keep ~30 pixels of background visible on each side of the peak
    #[arg(short, long, required_unless_present = "params")]
    pub window: Option<String>,

    /// Acquisition numbers to remove before fitting (1-based), e.g. "2,5"
    #[arg(long, value_delimiter = ',')]
    pub remove: Vec<usize>,

    /// Save the filtered scan to this path (.TTX)
    #[arg(long)]
    pub save_clean: Option<PathBuf>,

    /// Background window size on the left edge of the fit window [pix]
    #[arg(long, default_value_t = 10)]
    pub background_left: usize,

    /// Background window size on the right edge of the fit window [pix]
    #[arg(long, default_value_t = 10)]
    pub background_right: usize,

    /// Detector pixel size [mm]
    #[arg(long, default_value_t = DEFAULT_PIXEL_SIZE_MM)]
    pub pixel_size: f64,

    /// Export the per-acquisition peak positions as CSV
    #[arg(long)]
    pub peaks_csv: Option<PathBuf>,

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

/// 解析 "min-max" 形式的像素窗口（从 1 开始，两端都含）
pub fn parse_window(window: &str) -> Result<(usize, usize)> {
    let parts: Vec<&str> = window.split('-').collect();
    if parts.len() != 2 {
        return Err(XrdcalError::InvalidArgument(format!(
            "window '{}' (expected \"min-max\")",
            window
        )));
    }

    let min: usize = parts[0]
        .trim()
        .parse()
        .map_err(|_| XrdcalError::InvalidArgument(format!("window '{}'", window)))?;
    let max: usize = parts[1]
        .trim()
        .parse()
        .map_err(|_| XrdcalError::InvalidArgument(format!("window '{}'", window)))?;

    if min == 0 || max <= min {
        return Err(XrdcalError::InvalidArgument(format!(
            "window '{}' (must be 1 <= min < max)",
            window
        )));
    }

    Ok((min, max))
}
