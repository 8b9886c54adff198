//! # calibrate 子命令实现
//!
//! 直接入射参考扫描 → 逐采集单峰拟合 → (峰位, 2θ) 对 → 分段线性插值 →
//! 每像素角度校正表，写出 .CALI 文件。
//!
//! ## 依赖关系
//! - 使用 `cli/calibrate.rs` 定义的 CalibrateArgs
//! - 使用 `fit/peak.rs`, `fit/calibrate.rs`
//! - 使用 `parsers/ttx.rs`, `parsers/cali.rs`

use crate::cli::calibrate::CalibrateArgs;
use crate::error::{Result, XrdcalError};
use crate::fit::{calibrate, peak, SolveOptions};
use crate::models::config::{self, CalibrateConfig};
use crate::models::to_report_pixel;
use crate::parsers::{cali, ttx};
use crate::utils::output;

use tabled::{settings::Style, Table, Tabled};

/// 从命令行参数或参数快照得到生效配置
fn resolve_config(args: &CalibrateArgs) -> Result<CalibrateConfig> {
    let config = if let Some(path) = &args.params {
        let config: CalibrateConfig = config::load_snapshot(path)?;
        output::print_info(&format!("Parameters loaded from '{}'", path.display()));
        config
    } else {
        CalibrateConfig {
            scan: args
                .scan
                .clone()
                .ok_or_else(|| XrdcalError::InvalidArgument("missing scan file".into()))?,
            remove: args.remove.clone(),
            save_clean: args.save_clean.clone(),
            background_margin: args.background_margin,
            output: args.output.clone(),
        }
    };

    if let Some(path) = &args.save_params {
        config::save_snapshot(&config, path)?;
        output::print_success(&format!("Parameters saved to '{}'", path.display()));
    }

    Ok(config)
}

/// 标定峰位表的一行
#[derive(Tabled)]
struct CalibrationRow {
    #[tabled(rename = "n")]
    index: usize,
    #[tabled(rename = "2theta (deg)")]
    two_theta: String,
    #[tabled(rename = "pos (pix)")]
    position: String,
}

/// 执行探测器标定
pub fn execute(args: CalibrateArgs) -> Result<()> {
    output::print_header("Detector Calibration (direct incidence)");

    let config = resolve_config(&args)?;
    let opts = SolveOptions::default();

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

    // 每个采集一幅单峰图，初始猜测逐采集推导
    let results = peak::fit_isolated_peaks(&scan, config.background_margin, args.jobs, &opts)?;
    let positions: Vec<f64> = results.iter().map(|r| r.params.center).collect();
    let two_theta = scan.two_theta_series();

    let rows: Vec<CalibrationRow> = two_theta
        .iter()
        .zip(&positions)
        .enumerate()
        .map(|(ii, (tth, pos))| CalibrationRow {
            index: ii + 1,
            two_theta: format!("{:8.3}", tth),
            position: format!("{:8.2}", to_report_pixel(*pos)),
        })
        .collect();

    println!();
    println!("Fitted calibration peaks:");
    let mut table = Table::new(&rows);
    table.with(Style::psql());
    println!("{}", table);
    println!();

    let correction =
        calibrate::correction_table_from_peaks(&positions, &two_theta, scan.pixel_count())?;

    cali::write_table(&correction, &config.output)?;
    output::print_success(&format!(
        ".CALI file saved to '{}' ({} pixels)",
        config.output.display(),
        correction.len()
    ));

    Ok(())
}
