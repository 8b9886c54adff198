//! # 解析器模块
//!
//! 提供扫描文件与角度校正表的固定文本格式读写。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: ttx, cali

pub mod cali;
pub mod ttx;
