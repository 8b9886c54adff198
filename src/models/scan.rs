//! # 扫描数据模型
//!
//! 一次扫描 (Scan) 由若干采集 (Acquisition) 组成，每个采集记录四个电机角度
//! 与 1D 探测器上每个像素的计数。
//!
//! ## 序号约定
//! 像素编号与采集编号在所有外部接口（扫描文件、标定文件、终端报告）均从 1
//! 开始；内部存储与计算一律使用从 0 开始的下标。两种约定之间的换算只发生在
//! 本模块与 `parsers/` 的边界上：内部连续像素坐标 x 对应的外部像素编号为
//! x + 1（见 [`to_report_pixel`]）。
//!
//! ## 依赖关系
//! - 被 `parsers/ttx.rs`, `fit/`, `commands/` 使用

use crate::error::{Result, XrdcalError};

/// 一次采集：电机角度 + 探测器计数
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// 探测臂 2θ 角（度）
    pub two_theta: f64,
    /// ω 角（度）
    pub omega: f64,
    /// χ 角（度）
    pub chi: f64,
    /// φ 角（度）
    pub phi: f64,
    /// 每个像素的计数（非负，按像素顺序）
    pub counts: Vec<f64>,
}

/// 一次扫描：共享同一探测器/测角仪配置的采集序列
#[derive(Debug, Clone)]
pub struct Scan {
    acquisitions: Vec<Acquisition>,
    /// 探测器通道标签列（从扫描文件读入，重新写出时原样复用）
    pixel_labels: Vec<String>,
}

impl Scan {
    /// 创建扫描，检查非空与像素数一致性
    pub fn new(acquisitions: Vec<Acquisition>, pixel_labels: Vec<String>) -> Result<Self> {
        let first = acquisitions
            .first()
            .ok_or_else(|| XrdcalError::InvalidInput("scan contains no acquisitions".into()))?;

        let pixel_count = first.counts.len();
        if pixel_count == 0 {
            return Err(XrdcalError::InvalidInput(
                "acquisitions contain no pixels".into(),
            ));
        }

        for (ii, acq) in acquisitions.iter().enumerate() {
            if acq.counts.len() != pixel_count {
                return Err(XrdcalError::InvalidInput(format!(
                    "acquisition {} has {} pixels, expected {}",
                    ii + 1,
                    acq.counts.len(),
                    pixel_count
                )));
            }
        }

        if pixel_labels.len() != pixel_count {
            return Err(XrdcalError::InvalidInput(format!(
                "{} detector labels for {} pixels",
                pixel_labels.len(),
                pixel_count
            )));
        }

        Ok(Self {
            acquisitions,
            pixel_labels,
        })
    }

    /// 采集数量
    pub fn len(&self) -> usize {
        self.acquisitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acquisitions.is_empty()
    }

    /// 每个采集的像素数
    pub fn pixel_count(&self) -> usize {
        self.acquisitions[0].counts.len()
    }

    pub fn acquisitions(&self) -> &[Acquisition] {
        &self.acquisitions
    }

    pub fn pixel_labels(&self) -> &[String] {
        &self.pixel_labels
    }

    /// 各采集的 2θ 角序列
    pub fn two_theta_series(&self) -> Vec<f64> {
        self.acquisitions.iter().map(|a| a.two_theta).collect()
    }

    /// 各采集的 ω 角序列
    pub fn omega_series(&self) -> Vec<f64> {
        self.acquisitions.iter().map(|a| a.omega).collect()
    }

    /// 各采集的 χ 角序列
    pub fn chi_series(&self) -> Vec<f64> {
        self.acquisitions.iter().map(|a| a.chi).collect()
    }

    /// 去除指定采集（编号从 1 开始，对应文件中的块顺序），保持原有顺序。
    /// 列表中不存在的编号不产生任何效果。
    pub fn without_acquisitions(&self, remove: &[usize]) -> Result<Self> {
        let kept: Vec<Acquisition> = self
            .acquisitions
            .iter()
            .enumerate()
            .filter(|(ii, _)| !remove.contains(&(ii + 1)))
            .map(|(_, acq)| acq.clone())
            .collect();

        Scan::new(kept, self.pixel_labels.clone())
    }
}

/// 内部连续像素坐标 → 外部报告像素编号
pub fn to_report_pixel(x: f64) -> f64 {
    x + 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acq(tth: f64, counts: Vec<f64>) -> Acquisition {
        Acquisition {
            two_theta: tth,
            omega: tth / 2.0,
            chi: 0.0,
            phi: 0.0,
            counts,
        }
    }

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|ii| format!("{:.3}", ii as f64 * 0.1)).collect()
    }

    #[test]
    fn test_scan_rejects_empty() {
        assert!(Scan::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_scan_rejects_pixel_mismatch() {
        let acqs = vec![acq(1.0, vec![1.0, 2.0, 3.0]), acq(2.0, vec![1.0, 2.0])];
        assert!(Scan::new(acqs, labels(3)).is_err());
    }

    #[test]
    fn test_scan_rejects_label_mismatch() {
        let acqs = vec![acq(1.0, vec![1.0, 2.0, 3.0])];
        assert!(Scan::new(acqs, labels(2)).is_err());
    }

    #[test]
    fn test_without_acquisitions_keeps_order() {
        let acqs = (1..=6).map(|ii| acq(ii as f64, vec![0.0, 0.0])).collect();
        let scan = Scan::new(acqs, labels(2)).unwrap();

        let filtered = scan.without_acquisitions(&[2, 5]).unwrap();

        assert_eq!(filtered.len(), 4);
        let tth: Vec<f64> = filtered.two_theta_series();
        assert_eq!(tth, vec![1.0, 3.0, 4.0, 6.0]);
    }

    #[test]
    fn test_without_acquisitions_ignores_unknown_index() {
        let acqs = (1..=3).map(|ii| acq(ii as f64, vec![0.0])).collect();
        let scan = Scan::new(acqs, labels(1)).unwrap();

        let filtered = scan.without_acquisitions(&[9]).unwrap();
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn test_report_pixel_is_one_based() {
        assert_eq!(to_report_pixel(0.0), 1.0);
        assert_eq!(to_report_pixel(127.25), 128.25);
    }
}
