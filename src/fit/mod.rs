//! # 数值拟合模块
//!
//! 本工具的数值核心：峰形模型与初始猜测、Levenberg–Marquardt 最小二乘
//! 求解、以及三个下游几何拟合（光束对准、像素-角度标定、测角仪旋转中心）。
//!
//! ## 子模块
//! - `model`: 高斯峰 + 线性背景模型
//! - `guess`: 拟合初始猜测估计
//! - `solver`: 最小二乘求解器封装与协方差
//! - `peak`: 逐采集峰拟合
//! - `align`: 光束偏移几何模型
//! - `gonio`: 测角仪旋转中心模型
//! - `calibrate`: 像素-角度校正表的构建与应用
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `models/` 数据模型

pub mod align;
pub mod calibrate;
pub mod gonio;
pub mod guess;
pub mod model;
pub mod peak;
pub mod solver;

pub use align::AlignmentEstimate;
pub use model::PeakParameters;
pub use peak::FitResult;
pub use solver::SolveOptions;
