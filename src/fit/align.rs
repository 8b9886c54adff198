//! # 光束对准几何模型
//!
//! 两个几何模型把光束相对旋转轴的物理偏移与峰在探测器上的位移联系起来，
//! 对逐采集峰拟合得到的峰位序列做二参数最小二乘拟合：
//!
//! - 水平（ω 扫描, χ=0）:
//!   `position = l0 − e·sin((2θ−ω)·π/180) / sin(ω·π/180)`
//! - 垂直（χ 扫描, ω 固定）:
//!   `position = l0 + h·tan(χ·π/180)·sin(2θ·π/180) / sin(ω·π/180)`
//!
//! 拟合以偏移 0、参考峰位取窗口初始猜测的中心位置为起点。偏移按固定像素
//! 尺寸换算为 mm 报告；相对误差 |标准误差/估计值|·100% 在估计值接近 0 时
//! 会非常大，照原样报告，不做特殊处理。
//!
//! ## 依赖关系
//! - 被 `commands/align.rs` 使用
//! - 使用 `fit/solver.rs`

use crate::error::{Result, XrdcalError};
use crate::fit::solver::{self, NllsProblem, SolveOptions};
use nalgebra::{DMatrix, DVector};

/// 光束偏移估计及其标准误差
#[derive(Debug, Clone, Copy)]
pub struct AlignmentEstimate {
    /// 光束偏移（像素）
    pub offset: f64,
    /// 偏移的标准误差（像素）
    pub offset_std_error: f64,
    /// 参考峰位（内部连续像素坐标）
    pub reference: f64,
    /// 参考峰位的标准误差（像素）
    pub reference_std_error: f64,
}

impl AlignmentEstimate {
    /// 偏移换算为长度单位
    pub fn offset_mm(&self, pixel_size: f64) -> f64 {
        self.offset * pixel_size
    }

    /// 偏移标准误差换算为长度单位
    pub fn offset_std_error_mm(&self, pixel_size: f64) -> f64 {
        self.offset_std_error * pixel_size
    }

    /// 相对误差（%）
    pub fn relative_error_percent(&self) -> f64 {
        (self.offset_std_error * 100.0 / self.offset).abs()
    }
}

/// 水平模型的峰位预测
pub fn horizontal_position(tth: f64, omega: f64, offset: f64, reference: f64) -> f64 {
    reference - offset * (tth - omega).to_radians().sin() / omega.to_radians().sin()
}

/// 垂直模型的峰位预测（psi 为各采集的 χ 角）
pub fn vertical_position(tth: f64, omega: f64, psi: f64, offset: f64, reference: f64) -> f64 {
    reference + offset * psi.to_radians().tan() * tth.to_radians().sin() / omega.to_radians().sin()
}

struct HorizontalProblem<'a> {
    tth: &'a [f64],
    omega: &'a [f64],
    positions: &'a [f64],
}

impl NllsProblem for HorizontalProblem<'_> {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.positions.len(),
            (0..self.positions.len()).map(|ii| {
                horizontal_position(self.tth[ii], self.omega[ii], params[0], params[1])
                    - self.positions[ii]
            }),
        )
    }

    fn jacobian(&self, _params: &DVector<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(self.positions.len(), 2, |ii, jj| {
            if jj == 0 {
                -(self.tth[ii] - self.omega[ii]).to_radians().sin()
                    / self.omega[ii].to_radians().sin()
            } else {
                1.0
            }
        })
    }
}

struct VerticalProblem<'a> {
    tth: &'a [f64],
    omega: &'a [f64],
    chi: &'a [f64],
    positions: &'a [f64],
}

impl NllsProblem for VerticalProblem<'_> {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.positions.len(),
            (0..self.positions.len()).map(|ii| {
                vertical_position(
                    self.tth[ii],
                    self.omega[ii],
                    self.chi[ii],
                    params[0],
                    params[1],
                ) - self.positions[ii]
            }),
        )
    }

    fn jacobian(&self, _params: &DVector<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(self.positions.len(), 2, |ii, jj| {
            if jj == 0 {
                self.chi[ii].to_radians().tan() * self.tth[ii].to_radians().sin()
                    / self.omega[ii].to_radians().sin()
            } else {
                1.0
            }
        })
    }
}

fn check_series(lens: &[usize]) -> Result<()> {
    if lens.iter().any(|len| *len != lens[0]) {
        return Err(XrdcalError::InvalidInput(format!(
            "angle/position series have mismatched lengths: {:?}",
            lens
        )));
    }
    Ok(())
}

fn estimate_from(solution: solver::NllsSolution) -> AlignmentEstimate {
    AlignmentEstimate {
        offset: solution.params[0],
        offset_std_error: solution.std_error(0),
        reference: solution.params[1],
        reference_std_error: solution.std_error(1),
    }
}

/// 拟合水平光束偏移
pub fn fit_horizontal(
    tth: &[f64],
    omega: &[f64],
    positions: &[f64],
    reference_guess: f64,
    opts: &SolveOptions,
) -> Result<AlignmentEstimate> {
    check_series(&[tth.len(), omega.len(), positions.len()])?;

    let problem = HorizontalProblem {
        tth,
        omega,
        positions,
    };
    let x0 = DVector::from_vec(vec![0.0, reference_guess]);
    Ok(estimate_from(solver::solve(&problem, x0, opts)?))
}

/// 拟合垂直光束偏移
pub fn fit_vertical(
    tth: &[f64],
    omega: &[f64],
    chi: &[f64],
    positions: &[f64],
    reference_guess: f64,
    opts: &SolveOptions,
) -> Result<AlignmentEstimate> {
    check_series(&[tth.len(), omega.len(), chi.len(), positions.len()])?;

    let problem = VerticalProblem {
        tth,
        omega,
        chi,
        positions,
    };
    let x0 = DVector::from_vec(vec![0.0, reference_guess]);
    Ok(estimate_from(solver::solve(&problem, x0, opts)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_horizontal_zero_misalignment_is_recovered() {
        // e = 0 → 峰位与 ω 无关
        let omega: Vec<f64> = (1..=9).map(|ii| 4.0 + ii as f64).collect();
        let tth = vec![26.0; omega.len()];
        let positions = vec![151.3; omega.len()];

        let estimate =
            fit_horizontal(&tth, &omega, &positions, 150.0, &SolveOptions::default()).unwrap();

        assert!(estimate.offset.abs() < 1e-8);
        assert!(estimate.offset_std_error < 1e-6);
        assert_relative_eq!(estimate.reference, 151.3, epsilon = 1e-8);
    }

    #[test]
    fn test_horizontal_known_misalignment_is_recovered() {
        let omega: Vec<f64> = (0..12).map(|ii| 6.0 + ii as f64).collect();
        let tth = vec![30.0; omega.len()];
        let truth = (2.5, 148.0);
        let positions: Vec<f64> = omega
            .iter()
            .map(|ome| horizontal_position(30.0, *ome, truth.0, truth.1))
            .collect();

        let estimate =
            fit_horizontal(&tth, &omega, &positions, 150.0, &SolveOptions::default()).unwrap();

        assert_relative_eq!(estimate.offset, truth.0, epsilon = 1e-7);
        assert_relative_eq!(estimate.reference, truth.1, epsilon = 1e-7);
    }

    #[test]
    fn test_vertical_known_misalignment_is_recovered() {
        let chi: Vec<f64> = (-6..=6).map(|ii| 2.0 * ii as f64).collect();
        let tth = vec![32.0; chi.len()];
        let omega = vec![16.0; chi.len()];
        let truth = (-1.8, 140.5);
        let positions: Vec<f64> = chi
            .iter()
            .map(|psi| vertical_position(32.0, 16.0, *psi, truth.0, truth.1))
            .collect();

        let estimate = fit_vertical(
            &tth,
            &omega,
            &chi,
            &positions,
            139.0,
            &SolveOptions::default(),
        )
        .unwrap();

        assert_relative_eq!(estimate.offset, truth.0, epsilon = 1e-7);
        assert_relative_eq!(estimate.reference, truth.1, epsilon = 1e-7);
    }

    #[test]
    fn test_mismatched_series_are_rejected() {
        let err = fit_horizontal(
            &[30.0, 30.0],
            &[10.0, 11.0, 12.0],
            &[150.0, 150.0],
            150.0,
            &SolveOptions::default(),
        );
        assert!(matches!(err, Err(XrdcalError::InvalidInput(_))));
    }

    #[test]
    fn test_offset_reporting_conventions() {
        let estimate = AlignmentEstimate {
            offset: -2.0,
            offset_std_error: 0.1,
            reference: 150.0,
            reference_std_error: 0.05,
        };
        assert_relative_eq!(estimate.offset_mm(0.14), -0.28);
        assert_relative_eq!(estimate.offset_std_error_mm(0.14), 0.014);
        assert_relative_eq!(estimate.relative_error_percent(), 5.0);
    }
}
