//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `align-h`: 水平光束对准分析（ω 扫描）
//! - `align-v`: 垂直光束对准分析（χ 扫描）
//! - `calibrate`: 探测器像素-角度标定（直接入射 2θ 扫描）
//! - `read-image`: 应用校正表并导出校正后的谱图
//! - `gonio-center`: 测角仪旋转中心拟合
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: align, calibrate, gonio, image

pub mod align;
pub mod calibrate;
pub mod gonio;
pub mod image;

use clap::{Parser, Subcommand};

/// Xrdcal - 1D 探测器衍射仪几何标定工具箱
#[derive(Parser)]
#[command(name = "xrdcal")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Geometry calibration toolkit for diffractometers with 1D detectors", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Estimate the horizontal beam misalignment from an omega scan
    AlignH(align::AlignArgs),

    /// Estimate the vertical beam misalignment from a chi scan
    AlignV(align::AlignArgs),

    /// Build the per-pixel angle correction table from a direct-incidence scan
    Calibrate(calibrate::CalibrateArgs),

    /// Apply a correction table to a scan and export the corrected diagram
    ReadImage(image::ReadImageArgs),

    /// Locate the goniometer rotation center from comparator readings
    GonioCenter(gonio::GonioArgs),
}
