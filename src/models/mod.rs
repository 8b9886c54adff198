//! # 数据模型模块
//!
//! 定义扫描数据、角度校正表与各分析的类型化配置。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `fit/`, `commands/` 使用
//! - 子模块: scan, calibration, config

pub mod calibration;
pub mod config;
pub mod scan;

pub use calibration::CalibrationTable;
pub use config::{
    AlignConfig, CalibrateConfig, GonioCenterConfig, ReadImageConfig, DEFAULT_BACKGROUND_MARGIN,
    DEFAULT_PIXEL_SIZE_MM,
};
pub use scan::{to_report_pixel, Acquisition, Scan};
