//! # 非线性最小二乘求解器
//!
//! 在 `levenberg-marquardt` 库外包一层本工具的问题接口：各几何/峰形模型只
//! 提供残差与解析 Jacobian，参数向量的展平只发生在这一边界上。求解成功后
//! 按 pcov = s²(JᵀJ)⁻¹ (s² = SSR/(n−p)) 计算参数协方差，对角线开方即各参数
//! 的标准误差。
//!
//! ## 依赖关系
//! - 被 `fit/peak.rs`, `fit/align.rs`, `fit/gonio.rs` 使用
//! - 使用 `levenberg-marquardt`, `nalgebra`

use crate::error::{Result, XrdcalError};
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};

/// 最小二乘问题：残差向量 + 解析 Jacobian
pub trait NllsProblem {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64>;
}

/// 求解器选项
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// 目标函数相对下降容差
    pub ftol: f64,
    /// 梯度容差
    pub gtol: f64,
    /// 迭代预算
    pub max_iters: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            ftol: 1e-10,
            gtol: 1e-10,
            max_iters: 100,
        }
    }
}

/// 求解结果：最优参数与协方差
#[derive(Debug, Clone)]
pub struct NllsSolution {
    /// 最优参数向量
    pub params: DVector<f64>,
    /// 参数协方差矩阵 pcov = s²(JᵀJ)⁻¹
    pub covariance: DMatrix<f64>,
    /// 最优点的残差平方和
    pub cost: f64,
    /// 求解器的函数求值次数
    pub evaluations: usize,
}

impl NllsSolution {
    /// 第 ii 个参数的标准误差
    pub fn std_error(&self, ii: usize) -> f64 {
        self.covariance[(ii, ii)].sqrt()
    }
}

struct LmWrapper<'a, P: NllsProblem> {
    problem: &'a P,
    params: DVector<f64>,
}

impl<P: NllsProblem> LeastSquaresProblem<f64, Dyn, Dyn> for LmWrapper<'_, P> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(self.problem.residuals(&self.params))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        Some(self.problem.jacobian(&self.params))
    }
}

/// 求解最小二乘问题
pub fn solve<P: NllsProblem>(
    problem: &P,
    x0: DVector<f64>,
    opts: &SolveOptions,
) -> Result<NllsSolution> {
    let n_params = x0.len();
    if n_params == 0 {
        return Err(XrdcalError::InvalidInput("no fit parameters".into()));
    }

    let n_samples = problem.residuals(&x0).len();
    if n_samples == 0 {
        return Err(XrdcalError::InvalidInput("fit window is empty".into()));
    }
    if n_samples <= n_params {
        return Err(XrdcalError::InvalidInput(format!(
            "{} samples cannot constrain {} parameters",
            n_samples, n_params
        )));
    }

    let lm = LevenbergMarquardt::new()
        .with_ftol(opts.ftol)
        .with_xtol(opts.ftol)
        .with_gtol(opts.gtol)
        .with_patience(opts.max_iters.max(1));

    let wrapper = LmWrapper {
        problem,
        params: x0,
    };
    let (wrapper, report) = lm.minimize(wrapper);

    if !report.termination.was_successful() {
        return match report.termination {
            TerminationReason::Numerical(what) => Err(XrdcalError::NumericalInstability(format!(
                "non-finite value in least-squares solver: {}",
                what
            ))),
            other => Err(XrdcalError::FitDidNotConverge {
                context: format!(
                    "{:?} after {} evaluations",
                    other, report.number_of_evaluations
                ),
            }),
        };
    }

    let params = wrapper.params();
    if params.iter().any(|v| !v.is_finite()) {
        return Err(XrdcalError::NumericalInstability(
            "solver returned non-finite parameters".into(),
        ));
    }

    // pcov = s²(JᵀJ)⁻¹, scipy curve_fit 的约定
    let residuals = problem.residuals(&params);
    let jacobian = problem.jacobian(&params);
    let cost = residuals.norm_squared();
    let dof = (n_samples - n_params) as f64;
    let s2 = cost / dof;

    let jtj = jacobian.transpose() * &jacobian;
    let inverse = jtj.try_inverse().ok_or_else(|| {
        XrdcalError::NumericalInstability("normal matrix is singular at the optimum".into())
    })?;
    let covariance = inverse * s2;

    if covariance.iter().any(|v| !v.is_finite()) {
        return Err(XrdcalError::NumericalInstability(
            "covariance contains non-finite entries".into(),
        ));
    }

    Ok(NllsSolution {
        params,
        covariance,
        cost,
        evaluations: report.number_of_evaluations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// 一维问题: r(x) = x - 3
    struct OneDim;

    impl NllsProblem for OneDim {
        fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
            DVector::from_vec(vec![params[0] - 3.0, 0.0])
        }

        fn jacobian(&self, _params: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_vec(2, 1, vec![1.0, 0.0])
        }
    }

    /// 直线拟合: y = a + b·x
    struct Line {
        x: Vec<f64>,
        y: Vec<f64>,
    }

    impl NllsProblem for Line {
        fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
            DVector::from_iterator(
                self.x.len(),
                self.x
                    .iter()
                    .zip(&self.y)
                    .map(|(x, y)| params[0] + params[1] * x - y),
            )
        }

        fn jacobian(&self, _params: &DVector<f64>) -> DMatrix<f64> {
            DMatrix::from_fn(self.x.len(), 2, |ii, jj| {
                if jj == 0 {
                    1.0
                } else {
                    self.x[ii]
                }
            })
        }
    }

    #[test]
    fn test_solves_one_dimensional_problem() {
        let solution = solve(&OneDim, DVector::from_vec(vec![10.0]), &SolveOptions::default())
            .unwrap();
        assert_relative_eq!(solution.params[0], 3.0, epsilon = 1e-8);
        assert!(solution.cost < 1e-12);
        assert!(solution.evaluations > 0);
    }

    #[test]
    fn test_exact_line_fit_has_zero_errors() {
        let x: Vec<f64> = (0..8).map(|ii| ii as f64).collect();
        let y: Vec<f64> = x.iter().map(|x| 2.0 - 0.5 * x).collect();
        let problem = Line { x, y };

        let solution = solve(
            &problem,
            DVector::from_vec(vec![0.0, 0.0]),
            &SolveOptions::default(),
        )
        .unwrap();

        assert_relative_eq!(solution.params[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(solution.params[1], -0.5, epsilon = 1e-8);
        // 无噪声数据: SSR ≈ 0 → 标准误差 ≈ 0
        assert!(solution.std_error(0) < 1e-6);
        assert!(solution.std_error(1) < 1e-6);
    }

    #[test]
    fn test_underdetermined_fit_is_rejected() {
        let problem = Line {
            x: vec![1.0, 2.0],
            y: vec![1.0, 2.0],
        };
        let err = solve(
            &problem,
            DVector::from_vec(vec![0.0, 0.0]),
            &SolveOptions::default(),
        );
        assert!(matches!(err, Err(XrdcalError::InvalidInput(_))));
    }
}
