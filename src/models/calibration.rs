//! # 角度校正表数据模型
//!
//! 探测器每个像素的 2θ 角度校正值：把校正值加到名义 2θ 读数上即得真实角度。
//! 表项从像素 1 开始连续覆盖整个探测器；不要求单调（像素-角度关系是拟合
//! 出来的，物理上接近线性但不假定）。
//!
//! ## 依赖关系
//! - 被 `parsers/cali.rs`, `fit/calibrate.rs`, `commands/` 使用

use crate::error::{Result, XrdcalError};

/// 每像素角度校正表
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    corrections: Vec<f64>,
}

impl CalibrationTable {
    /// 创建校正表，长度必须等于探测器像素数且非零
    pub fn new(corrections: Vec<f64>) -> Result<Self> {
        if corrections.is_empty() {
            return Err(XrdcalError::InvalidInput(
                "calibration table contains no entries".into(),
            ));
        }
        Ok(Self { corrections })
    }

    /// 表项数量（= 探测器像素数）
    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    /// 所有校正值，下标 0 对应像素 1
    pub fn corrections(&self) -> &[f64] {
        &self.corrections
    }

    /// (像素编号, 校正值) 序列，像素编号从 1 开始
    pub fn entries(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.corrections
            .iter()
            .enumerate()
            .map(|(ii, c)| (ii + 1, *c))
    }
}
