//! # 分析配置与参数快照
//!
//! 每种分析一个显式的类型化配置结构，列出全部可识别选项及其默认值，
//! 取代按键访问的参数字典。配置可整体保存为参数快照文件（JSON），
//! 供下次运行原样恢复；数值、字符串与数值序列的往返是精确的。
//!
//! ## 依赖关系
//! - 被 `cli/`, `commands/` 使用
//! - 使用 `serde` / `serde_json`

use crate::error::{Result, XrdcalError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 探测器像素尺寸默认值（mm）
pub const DEFAULT_PIXEL_SIZE_MM: f64 = 0.14;

/// 标定峰拟合的默认背景窗口宽度（像素）
pub const DEFAULT_BACKGROUND_MARGIN: usize = 20;

/// 光束对准分析配置（水平与垂直共用同一组选项）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignConfig {
    /// 扫描文件路径
    pub scan: PathBuf,
    /// 要去除的采集编号（从 1 开始）
    pub remove: Vec<usize>,
    /// 去除后扫描的保存路径
    pub save_clean: Option<PathBuf>,
    /// 峰窗口下界（像素编号，从 1 开始，含）
    pub window_min: usize,
    /// 峰窗口上界（像素编号，从 1 开始，含）
    pub window_max: usize,
    /// 窗口左端背景子窗口宽度（像素）
    pub background_left: usize,
    /// 窗口右端背景子窗口宽度（像素）
    pub background_right: usize,
    /// 像素尺寸（mm）
    pub pixel_size: f64,
    /// 每采集峰位表的 CSV 导出路径
    pub peaks_csv: Option<PathBuf>,
}

/// 探测器标定分析配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrateConfig {
    /// 直接入射参考扫描文件路径
    pub scan: PathBuf,
    /// 要去除的采集编号（从 1 开始）
    pub remove: Vec<usize>,
    /// 去除后扫描的保存路径
    pub save_clean: Option<PathBuf>,
    /// 单峰拟合的背景窗口宽度（像素，两端各一个）
    pub background_margin: usize,
    /// 校正表输出路径
    pub output: PathBuf,
}

/// 读图分析配置：对扫描应用校正表并导出校正后的谱图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadImageConfig {
    /// 扫描文件路径
    pub scan: PathBuf,
    /// 校正表文件路径
    pub calibration: PathBuf,
    /// 要去除的采集编号（从 1 开始）
    pub remove: Vec<usize>,
    /// 去除后扫描的保存路径
    pub save_clean: Option<PathBuf>,
    /// 校正后谱图的 CSV 导出路径
    pub output: PathBuf,
}

/// 测角仪旋转中心分析配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GonioCenterConfig {
    /// 比较仪触头半径（mm，非直径）
    pub rtip: f64,
    /// 偏心距绝对值上限（mm）
    pub e_max: f64,
    /// 轴向偏移绝对值上限（mm）
    pub z0_max: f64,
    /// (角度, 读数) 数据文件路径；缺省时使用内置实测数据集
    pub data: Option<PathBuf>,
}

impl Default for GonioCenterConfig {
    fn default() -> Self {
        Self {
            rtip: 0.515,
            e_max: 10.0,
            z0_max: 20.0,
            data: None,
        }
    }
}

/// 保存参数快照
pub fn save_snapshot<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(config)?;
    fs::write(path, text).map_err(|e| XrdcalError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 读取参数快照
pub fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(XrdcalError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let text = fs::read_to_string(path).map_err(|e| XrdcalError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(serde_json::from_str(&text)?)
}
