//! # read-image 子命令实现
//!
//! 读入扫描与 .CALI 校正表，对每个采集重映射角度与强度，打印采集参数并把
//! 校正后的谱图导出为 CSV。
//!
//! ## 依赖关系
//! - 使用 `cli/image.rs` 定义的 ReadImageArgs
//! - 使用 `fit/calibrate.rs` 应用校正
//! - 使用 `parsers/ttx.rs`, `parsers/cali.rs`

use crate::cli::image::ReadImageArgs;
use crate::error::{Result, XrdcalError};
use crate::fit::calibrate;
use crate::models::config::{self, ReadImageConfig};
use crate::parsers::{cali, ttx};
use crate::utils::output;

use std::path::Path;

/// 从命令行参数或参数快照得到生效配置
fn resolve_config(args: &ReadImageArgs) -> Result<ReadImageConfig> {
    let config = if let Some(path) = &args.params {
        let config: ReadImageConfig = config::load_snapshot(path)?;
        output::print_info(&format!("Parameters loaded from '{}'", path.display()));
        config
    } else {
        ReadImageConfig {
            scan: args
                .scan
                .clone()
                .ok_or_else(|| XrdcalError::InvalidArgument("missing scan file".into()))?,
            calibration: args
                .calibration
                .clone()
                .ok_or_else(|| XrdcalError::InvalidArgument("missing --calibration".into()))?,
            remove: args.remove.clone(),
            save_clean: args.save_clean.clone(),
            output: args.output.clone(),
        }
    };

    if let Some(path) = &args.save_params {
        config::save_snapshot(&config, path)?;
        output::print_success(&format!("Parameters saved to '{}'", path.display()));
    }

    Ok(config)
}

/// 导出校正后的谱图 CSV：一行一个 (采集, 像素) 样本
fn export_diagram(diagram: &calibrate::CorrectedDiagram, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["acquisition", "pixel", "two_theta", "intensity"])?;

    for (ii, (angles, intensities)) in diagram
        .two_theta
        .iter()
        .zip(&diagram.intensity)
        .enumerate()
    {
        for (jj, (tth, cts)) in angles.iter().zip(intensities).enumerate() {
            wtr.write_record(&[
                (ii + 1).to_string(),
                (jj + 1).to_string(),
                format!("{:.4}", tth),
                format!("{:.4}", cts),
            ])?;
        }
    }

    wtr.flush().map_err(|e| XrdcalError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 执行读图分析
pub fn execute(args: ReadImageArgs) -> Result<()> {
    output::print_header("Corrected Diagram Export");

    let config = resolve_config(&args)?;

    let mut scan = ttx::read_scan(&config.scan)?;
    output::print_success(&format!(
        "Loaded scan '{}': {} acquisitions x {} pixels",
        config.scan.display(),
        scan.len(),
        scan.pixel_count()
    ));

    if !config.remove.is_empty() {
        scan = scan.without_acquisitions(&config.remove)?;
        output::print_info(&format!(
            "Removed acquisitions {:?}, {} left",
            config.remove,
            scan.len()
        ));
    }

    if let Some(path) = &config.save_clean {
        ttx::write_scan(&scan, path)?;
        output::print_success(&format!("Clean scan saved to '{}'", path.display()));
    }

    let table = cali::read_table(&config.calibration)?;
    output::print_info(&format!(
        "Loaded correction table '{}': {} pixels",
        config.calibration.display(),
        table.len()
    ));

    if table.len() != scan.pixel_count() {
        output::print_warning(&format!(
            "Correction table has {} pixels, scan has {}; using the first {}",
            table.len(),
            scan.pixel_count(),
            table.len().min(scan.pixel_count())
        ));
    }

    let diagram = calibrate::apply_correction(&scan, &table);
    let (tth_min, tth_max) = diagram.two_theta_range();

    output::print_separator();
    output::print_info(&format!("Number of acquisitions = {}", scan.len()));
    output::print_info(&format!("Number of pixels       = {}", diagram.pixel_count));
    output::print_info(&format!("2theta min             = {:5.2} deg", tth_min));
    output::print_info(&format!("2theta max             = {:5.2} deg", tth_max));

    export_diagram(&diagram, &config.output)?;
    output::print_success(&format!(
        "Corrected diagram saved to '{}'",
        config.output.display()
    ));

    Ok(())
}
