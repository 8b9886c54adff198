//! # 探测器像素-角度标定
//!
//! 以直接入射参考扫描（无样品，宽角度范围）为输入：每个采集在整幅谱上拟合
//! 一个孤立峰，收集 (峰位, 指令 2θ) 对，按峰位升序排序后建立分段线性插值
//! （数据范围外线性外推），在每个整数像素处求值并取负，得到加到名义 2θ 读数
//! 上的角度校正表。
//!
//! 也提供校正表的应用：按 `强度/cos(校正·π/180)` 重映射强度，按
//! `指令 2θ + 校正` 重映射角度；像素数取扫描与校正表两者的较小值，容忍
//! 裁过边缘通道的探测器所产生的长度不一致。
//!
//! ## 依赖关系
//! - 被 `commands/calibrate.rs`, `commands/image.rs` 使用
//! - 使用 `models/calibration.rs`, `models/scan.rs`

use crate::error::{Result, XrdcalError};
use crate::models::{CalibrationTable, Scan};

/// 分段线性插值，端点外沿端段线性外推。`xs` 必须升序。
fn interpolate_linear(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    let seg = if x <= xs[0] {
        0
    } else if x >= xs[n - 1] {
        n - 2
    } else {
        // partition_point 给出第一个 > x 的下标
        xs.partition_point(|v| *v <= x) - 1
    };

    let slope = (ys[seg + 1] - ys[seg]) / (xs[seg + 1] - xs[seg]);
    ys[seg] + slope * (x - xs[seg])
}

/// 从 (峰位, 指令 2θ) 对构建每像素角度校正表
///
/// `positions` 为内部 0 基连续像素坐标；表项按外部像素编号 1..=N 排列，
/// 第 p 项在内部坐标 p−1 处求值。
pub fn correction_table_from_peaks(
    positions: &[f64],
    two_theta: &[f64],
    pixel_count: usize,
) -> Result<CalibrationTable> {
    if positions.len() != two_theta.len() {
        return Err(XrdcalError::InvalidInput(format!(
            "{} peak positions for {} two-theta values",
            positions.len(),
            two_theta.len()
        )));
    }
    if positions.len() < 2 {
        return Err(XrdcalError::InvalidInput(
            "calibration needs at least 2 fitted peaks to interpolate".into(),
        ));
    }

    // 插值要求按峰位升序
    let mut pairs: Vec<(f64, f64)> = positions
        .iter()
        .copied()
        .zip(two_theta.iter().copied())
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    for window in pairs.windows(2) {
        if window[0].0 == window[1].0 {
            return Err(XrdcalError::NumericalInstability(format!(
                "two acquisitions share the same peak position {:.4}",
                window[0].0
            )));
        }
    }

    let xs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();

    let corrections: Vec<f64> = (1..=pixel_count)
        .map(|pixel| -interpolate_linear(&xs, &ys, (pixel - 1) as f64))
        .collect();

    CalibrationTable::new(corrections)
}

/// 校正后的谱图：每个采集每个像素的绝对 2θ 与重映射强度
#[derive(Debug, Clone)]
pub struct CorrectedDiagram {
    /// 参与校正的像素数 = min(扫描像素数, 校正表长度)
    pub pixel_count: usize,
    /// 每采集每像素的绝对 2θ（度）
    pub two_theta: Vec<Vec<f64>>,
    /// 每采集每像素的重映射强度
    pub intensity: Vec<Vec<f64>>,
}

impl CorrectedDiagram {
    /// 全部采集的 2θ 覆盖范围
    pub fn two_theta_range(&self) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for series in &self.two_theta {
            for value in series {
                min = min.min(*value);
                max = max.max(*value);
            }
        }
        (min, max)
    }
}

/// 对扫描应用角度校正表
pub fn apply_correction(scan: &Scan, table: &CalibrationTable) -> CorrectedDiagram {
    let pixel_count = scan.pixel_count().min(table.len());
    let corrections = &table.corrections()[..pixel_count];

    let mut two_theta = Vec::with_capacity(scan.len());
    let mut intensity = Vec::with_capacity(scan.len());

    for acq in scan.acquisitions() {
        two_theta.push(corrections.iter().map(|c| acq.two_theta + c).collect());
        intensity.push(
            acq.counts[..pixel_count]
                .iter()
                .zip(corrections)
                .map(|(cts, c)| cts / c.to_radians().cos())
                .collect(),
        );
    }

    CorrectedDiagram {
        pixel_count,
        two_theta,
        intensity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::model::PeakParameters;
    use crate::fit::peak;
    use crate::fit::solver::SolveOptions;
    use crate::models::Acquisition;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_relation_gives_exact_negated_map() {
        // tth = -0.5 + 0.08·pos，峰位只覆盖 [10, 40]，两端都要外推
        let positions: Vec<f64> = vec![10.0, 20.0, 30.0, 40.0];
        let two_theta: Vec<f64> = positions.iter().map(|p| -0.5 + 0.08 * p).collect();

        let table = correction_table_from_peaks(&positions, &two_theta, 64).unwrap();

        assert_eq!(table.len(), 64);
        for (pixel, correction) in table.entries() {
            let expected = -(-0.5 + 0.08 * (pixel - 1) as f64);
            assert_relative_eq!(correction, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unsorted_peaks_are_sorted_before_interpolation() {
        let positions = vec![40.0, 10.0, 30.0, 20.0];
        let two_theta: Vec<f64> = positions.iter().map(|p| 1.0 + 0.1 * p).collect();

        let table = correction_table_from_peaks(&positions, &two_theta, 50).unwrap();
        for (pixel, correction) in table.entries() {
            let expected = -(1.0 + 0.1 * (pixel - 1) as f64);
            assert_relative_eq!(correction, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_duplicate_positions_are_rejected() {
        let err = correction_table_from_peaks(&[10.0, 10.0, 20.0], &[1.0, 1.1, 2.0], 32);
        assert!(matches!(err, Err(XrdcalError::NumericalInstability(_))));
    }

    #[test]
    fn test_too_few_peaks_are_rejected() {
        let err = correction_table_from_peaks(&[10.0], &[1.0], 32);
        assert!(matches!(err, Err(XrdcalError::InvalidInput(_))));
    }

    #[test]
    fn test_apply_correction_formulas_and_truncation() {
        let scan = Scan::new(
            vec![Acquisition {
                two_theta: 10.0,
                omega: 5.0,
                chi: 0.0,
                phi: 0.0,
                counts: vec![100.0, 200.0, 300.0],
            }],
            vec!["a".into(), "b".into(), "c".into()],
        )
        .unwrap();
        // 校正表比扫描短一个像素 → 截到 2 个像素
        let table = CalibrationTable::new(vec![1.5, -2.0]).unwrap();

        let diagram = apply_correction(&scan, &table);

        assert_eq!(diagram.pixel_count, 2);
        assert_relative_eq!(diagram.two_theta[0][0], 11.5);
        assert_relative_eq!(diagram.two_theta[0][1], 8.0);
        assert_relative_eq!(diagram.intensity[0][0], 100.0 / 1.5_f64.to_radians().cos());
        assert_relative_eq!(diagram.intensity[0][1], 200.0 / 2.0_f64.to_radians().cos());

        let (min, max) = diagram.two_theta_range();
        assert_relative_eq!(min, 8.0);
        assert_relative_eq!(max, 11.5);
    }

    #[test]
    fn test_synthetic_reference_scan_end_to_end() {
        // 峰心与 2θ 为严格线性关系的合成参考扫描
        let centers = [12.0, 22.0, 32.0, 42.0, 52.0];
        let tth_of = |pos: f64| -0.5 + 0.08 * pos;

        let acquisitions: Vec<Acquisition> = centers
            .iter()
            .map(|center| {
                let p = PeakParameters {
                    center: *center,
                    amplitude: 1000.0,
                    fwhm: 4.0,
                    bg_intercept: 5.0,
                    bg_slope: 0.0,
                };
                Acquisition {
                    two_theta: tth_of(*center),
                    omega: 0.0,
                    chi: 0.0,
                    phi: 0.0,
                    counts: (0..64).map(|ii| p.value_at(ii as f64)).collect(),
                }
            })
            .collect();
        let scan = Scan::new(acquisitions, (0..64).map(|ii| ii.to_string()).collect()).unwrap();

        let results = peak::fit_isolated_peaks(&scan, 20, 1, &SolveOptions::default()).unwrap();
        let positions: Vec<f64> = results.iter().map(|r| r.params.center).collect();
        let two_theta = scan.two_theta_series();

        let table =
            correction_table_from_peaks(&positions, &two_theta, scan.pixel_count()).unwrap();

        // 线性关系 → 校正表即取负的线性映射，范围外像素为同一直线的外推
        for (pixel, correction) in table.entries() {
            let expected = -tth_of((pixel - 1) as f64);
            assert_relative_eq!(correction, expected, epsilon = 1e-5);
        }
    }
}
