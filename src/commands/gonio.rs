//! # gonio-center 子命令实现
//!
//! 比较仪 (角度, 读数) 数据 → 旋转中心拟合。数据取自 CSV 文件，缺省时使用
//! 内置的实测数据集。
//!
//! ## 依赖关系
//! - 使用 `cli/gonio.rs` 定义的 GonioArgs
//! - 使用 `fit/gonio.rs`
//! - 使用 `csv` 读数据文件

use crate::cli::gonio::GonioArgs;
use crate::error::{Result, XrdcalError};
use crate::fit::gonio;
use crate::fit::SolveOptions;
use crate::models::config::{self, GonioCenterConfig};
use crate::utils::output;

use std::path::Path;

/// 从命令行参数或参数快照得到生效配置
fn resolve_config(args: &GonioArgs) -> Result<GonioCenterConfig> {
    let config = if let Some(path) = &args.params {
        let config: GonioCenterConfig = config::load_snapshot(path)?;
        output::print_info(&format!("Parameters loaded from '{}'", path.display()));
        config
    } else {
        GonioCenterConfig {
            rtip: args.rtip,
            e_max: args.e_max,
            z0_max: args.z0_max,
            data: args.data.clone(),
        }
    };

    if let Some(path) = &args.save_params {
        config::save_snapshot(&config, path)?;
        output::print_success(&format!("Parameters saved to '{}'", path.display()));
    }

    Ok(config)
}

/// 读取 "angle,reading" 两列 CSV 数据文件
fn read_dataset(path: &Path) -> Result<(Vec<f64>, Vec<f64>)> {
    if !path.exists() {
        return Err(XrdcalError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut alpha = Vec::new();
    let mut readings = Vec::new();

    for record in reader.deserialize::<(f64, f64)>() {
        let (angle, reading) = record?;
        alpha.push(angle);
        readings.push(reading);
    }

    if alpha.is_empty() {
        return Err(XrdcalError::ParseError {
            format: "gonio dataset".to_string(),
            path: path.display().to_string(),
            reason: "no data rows".to_string(),
        });
    }

    Ok((alpha, readings))
}

/// 执行旋转中心分析
pub fn execute(args: GonioArgs) -> Result<()> {
    output::print_header("Goniometer Rotation Center");

    let config = resolve_config(&args)?;

    let (alpha, readings) = match &config.data {
        Some(path) => {
            let dataset = read_dataset(path)?;
            output::print_success(&format!(
                "Loaded {} comparator readings from '{}'",
                dataset.0.len(),
                path.display()
            ));
            dataset
        }
        None => {
            let dataset = gonio::default_dataset();
            output::print_info(&format!(
                "Using the built-in measured dataset ({} points)",
                dataset.0.len()
            ));
            dataset
        }
    };

    let fit = gonio::fit_center(
        &alpha,
        &readings,
        config.rtip,
        config.e_max,
        config.z0_max,
        &SolveOptions::default(),
    )?;

    output::print_info(&format!("Comparator tip radius : {:.3} mm", fit.rtip));
    output::print_result(
        "eccentricity e ",
        fit.eccentricity,
        fit.eccentricity_std_error,
        "mm",
    );
    output::print_result(
        "axial offset z0",
        fit.axial_offset,
        fit.axial_offset_std_error,
        "mm",
    );

    output::print_separator();
    output::print_success(&format!(
        "Rotation center expected at z = {:.3} mm",
        fit.rotation_center()
    ));

    Ok(())
}
