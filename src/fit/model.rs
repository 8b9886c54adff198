//! # 峰形模型
//!
//! 高斯峰 + 线性背景的解析模型：
//! ```text
//! gauss(x)      = IM * exp(-4*ln2 * (x - x0)^2 / H^2)
//! background(x) = A + B*x
//! model(x)      = gauss(x) + background(x)
//! ```
//! H 为半高全宽 (FWHM)；系数 4·ln2 ≈ 2.77258872224 把 FWHM 换算为高斯指数
//! 系数。背景两个系数对每个采集都是自由参数。模型同时提供对五个参数的解析
//! 偏导数，供求解器组装 Jacobian。
//!
//! ## 依赖关系
//! - 被 `fit/guess.rs`, `fit/peak.rs` 使用

use nalgebra::DVector;
use std::f64::consts::LN_2;

/// FWHM → 高斯指数系数 (= 4·ln2 ≈ 2.77258872224)
pub const FWHM_EXPONENT: f64 = 4.0 * LN_2;

/// 峰拟合的五个参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakParameters {
    /// 峰中心位置 x0（连续像素坐标，内部从 0 开始）
    pub center: f64,
    /// 峰最大强度 IM
    pub amplitude: f64,
    /// 半高全宽 H（> 0 拟合才有意义，由调用方的窗口保证）
    pub fwhm: f64,
    /// 背景截距 A
    pub bg_intercept: f64,
    /// 背景斜率 B
    pub bg_slope: f64,
}

impl PeakParameters {
    /// 模型在 x 处的值
    pub fn value_at(&self, x: f64) -> f64 {
        gauss(x, self.center, self.amplitude, self.fwhm) + self.bg_intercept + self.bg_slope * x
    }

    /// 模型在 x 处对 (x0, IM, H, A, B) 的偏导数
    pub fn gradient_at(&self, x: f64) -> [f64; 5] {
        let d = x - self.center;
        let h2 = self.fwhm * self.fwhm;
        let envelope = (-FWHM_EXPONENT * d * d / h2).exp();
        let g = self.amplitude * envelope;

        [
            g * 2.0 * FWHM_EXPONENT * d / h2,
            envelope,
            g * 2.0 * FWHM_EXPONENT * d * d / (h2 * self.fwhm),
            1.0,
            x,
        ]
    }

    /// 展平为数值向量（仅在求解器边界使用）
    pub fn to_vector(self) -> DVector<f64> {
        DVector::from_vec(vec![
            self.center,
            self.amplitude,
            self.fwhm,
            self.bg_intercept,
            self.bg_slope,
        ])
    }

    /// 从数值向量恢复（仅在求解器边界使用）
    pub fn from_vector(v: &DVector<f64>) -> Self {
        Self {
            center: v[0],
            amplitude: v[1],
            fwhm: v[2],
            bg_intercept: v[3],
            bg_slope: v[4],
        }
    }
}

/// 高斯分布（3 参数）
pub fn gauss(x: f64, center: f64, amplitude: f64, fwhm: f64) -> f64 {
    let d = x - center;
    amplitude * (-FWHM_EXPONENT * d * d / (fwhm * fwhm)).exp()
}
