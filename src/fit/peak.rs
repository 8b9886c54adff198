//! # 峰拟合器
//!
//! 在工作窗口内把峰形模型（`fit/model.rs`）拟合到单个采集的强度谱，以及在
//! rayon 线程池上对整个扫描逐采集并行拟合。各采集的拟合相互独立，只共享
//! 只读的初始猜测；结果按采集顺序收集，任何一个采集的拟合失败都会带着
//! 采集编号中止整个流程。
//!
//! 调用方应提供把峰完整框住、两侧各留约 30 像素背景的窗口；窗口是否真的
//! 框住一个峰不在此验证。
//!
//! ## 依赖关系
//! - 被 `commands/`, `fit/calibrate.rs` 使用
//! - 使用 `fit/model.rs`, `fit/guess.rs`, `fit/solver.rs`
//! - 使用 `rayon` 并行，`utils/progress.rs` 显示进度

use crate::error::{Result, XrdcalError};
use crate::fit::guess;
use crate::fit::model::PeakParameters;
use crate::fit::solver::{self, NllsProblem, SolveOptions};
use crate::models::Scan;
use crate::utils::progress;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::ops::Range;

/// 单个采集的峰拟合结果
#[derive(Debug, Clone)]
pub struct FitResult {
    /// 最优峰参数
    pub params: PeakParameters,
    /// 5×5 参数协方差矩阵
    pub covariance: DMatrix<f64>,
}

impl FitResult {
    /// 峰中心位置的标准误差
    pub fn center_std_error(&self) -> f64 {
        self.covariance[(0, 0)].sqrt()
    }
}

/// 窗口内的峰形最小二乘问题
struct PeakProblem<'a> {
    x: &'a [f64],
    y: &'a [f64],
}

impl NllsProblem for PeakProblem<'_> {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let p = PeakParameters::from_vector(params);
        DVector::from_iterator(
            self.x.len(),
            self.x.iter().zip(self.y).map(|(x, y)| p.value_at(*x) - y),
        )
    }

    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        let p = PeakParameters::from_vector(params);
        DMatrix::from_fn(self.x.len(), 5, |ii, jj| p.gradient_at(self.x[ii])[jj])
    }
}

/// 拟合一个窗口化的强度谱
pub fn fit_peak(
    x: &[f64],
    y: &[f64],
    initial: &PeakParameters,
    opts: &SolveOptions,
) -> Result<FitResult> {
    if x.len() != y.len() {
        return Err(XrdcalError::InvalidInput(format!(
            "{} abscissae for {} intensities",
            x.len(),
            y.len()
        )));
    }

    let problem = PeakProblem { x, y };
    let solution = solver::solve(&problem, initial.to_vector(), opts)?;

    Ok(FitResult {
        params: PeakParameters::from_vector(&solution.params),
        covariance: solution.covariance,
    })
}

/// 给拟合错误补上采集编号（从 1 开始）
fn with_acquisition(err: XrdcalError, index: usize) -> XrdcalError {
    let tag = |msg: String| format!("acquisition {}: {}", index + 1, msg);
    match err {
        XrdcalError::FitDidNotConverge { context } => XrdcalError::FitDidNotConverge {
            context: tag(context),
        },
        XrdcalError::NumericalInstability(msg) => XrdcalError::NumericalInstability(tag(msg)),
        XrdcalError::InvalidInput(msg) => XrdcalError::InvalidInput(tag(msg)),
        XrdcalError::InvalidWindow(msg) => XrdcalError::InvalidWindow(tag(msg)),
        other => other,
    }
}

/// 在线程池上逐采集拟合，保持采集顺序
fn fit_all<F>(count: usize, jobs: usize, message: &str, fit_one: F) -> Result<Vec<FitResult>>
where
    F: Fn(usize) -> Result<FitResult> + Sync,
{
    let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| XrdcalError::Other(format!("failed to build fit thread pool: {}", e)))?;

    let pb = progress::fit_progress_bar(count as u64, message);

    let results: Result<Vec<FitResult>> = pool.install(|| {
        (0..count)
            .into_par_iter()
            .map(|ii| {
                let result = fit_one(ii).map_err(|e| with_acquisition(e, ii));
                pb.inc(1);
                result
            })
            .collect()
    });

    pb.finish_and_clear();
    results
}

/// 对扫描的每个采集在同一窗口内拟合峰，共用一个初始猜测（对准路径）
pub fn fit_scan_window(
    scan: &Scan,
    window: &Range<usize>,
    initial: &PeakParameters,
    jobs: usize,
    opts: &SolveOptions,
) -> Result<Vec<FitResult>> {
    if window.start >= window.end || window.end > scan.pixel_count() {
        return Err(XrdcalError::InvalidWindow(format!(
            "window {}..{} outside detector of {} pixels",
            window.start,
            window.end,
            scan.pixel_count()
        )));
    }

    let x: Vec<f64> = window.clone().map(|ii| ii as f64).collect();

    fit_all(scan.len(), jobs, "Fitting peaks", |ii| {
        let y = &scan.acquisitions()[ii].counts[window.clone()];
        fit_peak(&x, y, initial, opts)
    })
}

/// 对扫描的每个采集做整幅单峰拟合，初始猜测逐采集推导（标定路径）
pub fn fit_isolated_peaks(
    scan: &Scan,
    background_margin: usize,
    jobs: usize,
    opts: &SolveOptions,
) -> Result<Vec<FitResult>> {
    let x: Vec<f64> = (0..scan.pixel_count()).map(|ii| ii as f64).collect();

    fit_all(scan.len(), jobs, "Fitting calibration peaks", |ii| {
        let counts = &scan.acquisitions()[ii].counts;
        let initial = guess::single_profile_guess(counts, background_margin)?;
        fit_peak(&x, counts, &initial, opts)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Acquisition;
    use approx::assert_relative_eq;

    fn synthetic_profile(p: &PeakParameters, n: usize, noise: f64) -> Vec<f64> {
        (0..n)
            .map(|ii| {
                let x = ii as f64;
                // 确定性伪噪声
                p.value_at(x) + noise * (x * 12.9898).sin()
            })
            .collect()
    }

    fn truth() -> PeakParameters {
        PeakParameters {
            center: 64.0,
            amplitude: 1800.0,
            fwhm: 9.0,
            bg_intercept: 40.0,
            bg_slope: 0.2,
        }
    }

    #[test]
    fn test_noiseless_fit_recovers_parameters_exactly() {
        let p = truth();
        let y = synthetic_profile(&p, 128, 0.0);
        let x: Vec<f64> = (0..128).map(|ii| ii as f64).collect();

        let initial = guess::single_profile_guess(&y, 20).unwrap();
        let result = fit_peak(&x, &y, &initial, &SolveOptions::default()).unwrap();

        assert_relative_eq!(result.params.center, p.center, epsilon = 1e-6);
        assert_relative_eq!(result.params.amplitude, p.amplitude, max_relative = 1e-6);
        assert_relative_eq!(result.params.fwhm, p.fwhm, max_relative = 1e-6);
        assert_relative_eq!(result.params.bg_intercept, p.bg_intercept, max_relative = 1e-5);
        assert!(result.center_std_error() < 1e-6);
    }

    #[test]
    fn test_noisy_fit_recovers_parameters_within_tolerance() {
        let p = truth();
        let y = synthetic_profile(&p, 128, 5.0);
        let x: Vec<f64> = (0..128).map(|ii| ii as f64).collect();

        let initial = guess::single_profile_guess(&y, 20).unwrap();
        let result = fit_peak(&x, &y, &initial, &SolveOptions::default()).unwrap();

        assert_relative_eq!(result.params.center, p.center, epsilon = 0.1);
        assert_relative_eq!(result.params.amplitude, p.amplitude, max_relative = 0.01);
        assert_relative_eq!(result.params.fwhm, p.fwhm, max_relative = 0.02);
        assert!(result.center_std_error() > 0.0);
    }

    #[test]
    fn test_length_mismatch_is_invalid_input() {
        let err = fit_peak(
            &[0.0, 1.0],
            &[1.0],
            &truth(),
            &SolveOptions::default(),
        );
        assert!(matches!(err, Err(XrdcalError::InvalidInput(_))));
    }

    #[test]
    fn test_fit_scan_window_keeps_acquisition_order() {
        // 两个采集，峰心分别在 60 和 68
        let make = |center: f64| {
            let p = PeakParameters { center, ..truth() };
            Acquisition {
                two_theta: 0.0,
                omega: 0.0,
                chi: 0.0,
                phi: 0.0,
                counts: synthetic_profile(&p, 128, 0.0),
            }
        };
        let scan = Scan::new(
            vec![make(60.0), make(68.0)],
            (0..128).map(|ii| ii.to_string()).collect(),
        )
        .unwrap();

        let initial = guess::aggregate_guess(&scan, &(30..98), 10, 10).unwrap();
        let results =
            fit_scan_window(&scan, &(30..98), &initial, 1, &SolveOptions::default()).unwrap();

        assert_eq!(results.len(), 2);
        assert_relative_eq!(results[0].params.center, 60.0, epsilon = 1e-5);
        assert_relative_eq!(results[1].params.center, 68.0, epsilon = 1e-5);
    }

    #[test]
    fn test_fit_scan_window_rejects_bad_window() {
        let scan = Scan::new(
            vec![Acquisition {
                two_theta: 0.0,
                omega: 0.0,
                chi: 0.0,
                phi: 0.0,
                counts: vec![0.0; 16],
            }],
            (0..16).map(|ii| ii.to_string()).collect(),
        )
        .unwrap();

        let err = fit_scan_window(&scan, &(8..40), &truth(), 1, &SolveOptions::default());
        assert!(matches!(err, Err(XrdcalError::InvalidWindow(_))));
    }
}
