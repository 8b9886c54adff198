//! # 峰拟合初始猜测
//!
//! 从原始强度数据推导拟合起点，避免非凸拟合对初值的敏感性毁掉收敛：
//! - 中心位置取窗口内最大强度的像素
//! - 峰高取最大强度
//! - FWHM 用 梯形积分 / 最大强度 近似（面积 ≈ 峰高 × FWHM）
//! - 背景直线过左右两个边缘子窗口的 (中点, 平均强度)
//!
//! 单谱变体用于标定（整幅图一个孤立峰）；聚合变体对扫描的每个采集在固定
//! 窗口内计算同样五个量再取算术平均，作为整个扫描共用的稳健起点（相邻采集
//! 间峰移相对窗口很小）。
//!
//! ## 依赖关系
//! - 被 `fit/peak.rs`, `commands/` 使用
//! - 使用 `fit/model.rs` 的 PeakParameters

use crate::error::{Result, XrdcalError};
use crate::fit::model::PeakParameters;
use crate::models::Scan;
use std::ops::Range;

/// 单位像素间距下的梯形法积分
pub fn trapezoid_integral(values: &[f64]) -> f64 {
    let mut total = 0.0;
    for ii in 0..values.len().saturating_sub(1) {
        total += 0.5 * (values[ii] + values[ii + 1]);
    }
    total
}

/// 首个最大值的下标
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (ii, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = ii;
        }
    }
    best
}

/// 检查窗口与背景子窗口是否落在谱内
fn check_window(len: usize, window: &Range<usize>, bg_left: usize, bg_right: usize) -> Result<()> {
    if window.start >= window.end || window.end > len {
        return Err(XrdcalError::InvalidWindow(format!(
            "window {}..{} outside profile of {} pixels",
            window.start, window.end, len
        )));
    }

    let width = window.end - window.start;
    if bg_left == 0 || bg_right == 0 || bg_left + bg_right > width {
        return Err(XrdcalError::InvalidWindow(format!(
            "background windows {}+{} do not fit in a {}-pixel peak window",
            bg_left, bg_right, width
        )));
    }

    Ok(())
}

/// 对单个采集在 [window) 内计算初始猜测
pub fn windowed_guess(
    counts: &[f64],
    window: &Range<usize>,
    bg_left: usize,
    bg_right: usize,
) -> Result<PeakParameters> {
    check_window(counts.len(), window, bg_left, bg_right)?;

    let slice = &counts[window.clone()];
    let peak = argmax(slice);
    let amplitude = slice[peak];

    if amplitude <= 0.0 {
        return Err(XrdcalError::NumericalInstability(
            "maximum intensity in the peak window is zero, FWHM estimate undefined".into(),
        ));
    }

    let center = (window.start + peak) as f64;
    let fwhm = trapezoid_integral(slice) / amplitude;

    // 背景直线过左右子窗口的 (中点, 平均值)
    let left = &counts[window.start..window.start + bg_left];
    let right = &counts[window.end - bg_right..window.end];

    let left_value = left.iter().sum::<f64>() / bg_left as f64;
    let right_value = right.iter().sum::<f64>() / bg_right as f64;

    let left_mid = window.start as f64 + bg_left as f64 / 2.0;
    let right_mid = window.end as f64 - bg_right as f64 / 2.0;

    let bg_slope = (left_value - right_value) / (left_mid - right_mid);
    let bg_intercept = left_value - bg_slope * left_mid;

    Ok(PeakParameters {
        center,
        amplitude,
        fwhm,
        bg_intercept,
        bg_slope,
    })
}

/// 对整幅单峰图计算初始猜测（标定路径），背景窗口取两端各 `margin` 个像素
pub fn single_profile_guess(counts: &[f64], margin: usize) -> Result<PeakParameters> {
    windowed_guess(counts, &(0..counts.len()), margin, margin)
}

/// 对扫描的全部采集在同一窗口内计算初始猜测并取算术平均
pub fn aggregate_guess(
    scan: &Scan,
    window: &Range<usize>,
    bg_left: usize,
    bg_right: usize,
) -> Result<PeakParameters> {
    let mut sum = PeakParameters {
        center: 0.0,
        amplitude: 0.0,
        fwhm: 0.0,
        bg_intercept: 0.0,
        bg_slope: 0.0,
    };

    for acq in scan.acquisitions() {
        let guess = windowed_guess(&acq.counts, window, bg_left, bg_right)?;
        sum.center += guess.center;
        sum.amplitude += guess.amplitude;
        sum.fwhm += guess.fwhm;
        sum.bg_intercept += guess.bg_intercept;
        sum.bg_slope += guess.bg_slope;
    }

    let n = scan.len() as f64;
    Ok(PeakParameters {
        center: sum.center / n,
        amplitude: sum.amplitude / n,
        fwhm: sum.fwhm / n,
        bg_intercept: sum.bg_intercept / n,
        bg_slope: sum.bg_slope / n,
    })
}
