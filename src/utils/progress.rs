//! # 进度条工具
//!
//! 封装 `indicatif`，为逐采集拟合提供统一的进度条样式。
//!
//! ## 依赖关系
//! - 被 `fit/peak.rs` 使用
//! - 使用 `indicatif` crate

use indicatif::{ProgressBar, ProgressStyle};

/// 创建逐采集拟合进度条
pub fn fit_progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}
