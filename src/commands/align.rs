//! # 光束对准子命令实现
//!
//! 水平（ω 扫描）与垂直（χ 扫描）共用同一条流水线：读扫描 → 剔除坏采集 →
//! 聚合初始猜测 → 逐采集峰拟合 → 峰位表 → 几何模型拟合 → 偏移报告。
//! 两个变体只在扫描轴、几何模型与报告文字上不同。
//!
//! ## 依赖关系
//! - 使用 `cli/align.rs` 定义的 AlignArgs
//! - 使用 `fit/` 进行猜测、峰拟合与几何拟合
//! - 使用 `parsers/ttx.rs` 读写扫描

use crate::cli::align::{parse_window, AlignArgs};
use crate::error::{Result, XrdcalError};
use crate::fit::{align, guess, peak, AlignmentEstimate, SolveOptions};
use crate::models::config::{self, AlignConfig};
use crate::models::{to_report_pixel, Scan};
use crate::parsers::ttx;
use crate::utils::output;

use std::ops::Range;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// 对准变体：决定扫描轴与几何模型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Horizontal,
    Vertical,
}

impl Variant {
    fn title(self) -> &'static str {
        match self {
            Variant::Horizontal => "Horizontal Beam Alignment (omega scan)",
            Variant::Vertical => "Vertical Beam Alignment (chi scan)",
        }
    }

    fn scanned_axis(self) -> &'static str {
        match self {
            Variant::Horizontal => "omega",
            Variant::Vertical => "chi",
        }
    }
}

/// 执行水平光束对准分析
pub fn execute_horizontal(args: AlignArgs) -> Result<()> {
    execute(args, Variant::Horizontal)
}

/// 执行垂直光束对准分析
pub fn execute_vertical(args: AlignArgs) -> Result<()> {
    execute(args, Variant::Vertical)
}

/// 从命令行参数或参数快照得到生效配置
fn resolve_config(args: &AlignArgs) -> Result<AlignConfig> {
    let config = if let Some(path) = &args.params {
        let config: AlignConfig = config::load_snapshot(path)?;
        output::print_info(&format!("Parameters loaded from '{}'", path.display()));
        config
    } else {
        let window = args
            .window
            .as_deref()
            .ok_or_else(|| XrdcalError::InvalidArgument("missing --window".into()))?;
        let (window_min, window_max) = parse_window(window)?;

        AlignConfig {
            scan: args
                .scan
                .clone()
                .ok_or_else(|| XrdcalError::InvalidArgument("missing scan file".into()))?,
            remove: args.remove.clone(),
            save_clean: args.save_clean.clone(),
            window_min,
            window_max,
            background_left: args.background_left,
            background_right: args.background_right,
            pixel_size: args.pixel_size,
            peaks_csv: args.peaks_csv.clone(),
        }
    };

    if let Some(path) = &args.save_params {
        config::save_snapshot(&config, path)?;
        output::print_success(&format!("Parameters saved to '{}'", path.display()));
    }

    Ok(config)
}

/// 峰位表的一行
#[derive(Tabled)]
struct PeakRow {
    #[tabled(rename = "n")]
    index: usize,
    #[tabled(rename = "angle (deg)")]
    angle: String,
    #[tabled(rename = "pos (pix)")]
    position: String,
}

fn print_peak_table(variant: Variant, angles: &[f64], positions: &[f64]) {
    let rows: Vec<PeakRow> = angles
        .iter()
        .zip(positions)
        .enumerate()
        .map(|(ii, (angle, pos))| PeakRow {
            index: ii + 1,
            angle: format!("{:8.3}", angle),
            position: format!("{:8.2}", to_report_pixel(*pos)),
        })
        .collect();

    println!();
    println!("Peak position vs {}:", variant.scanned_axis());
    let mut table = Table::new(&rows);
    table.with(Style::psql());
    println!("{}", table);
    println!();
}

/// 导出逐采集峰位 CSV
fn export_peaks_csv(
    scan: &Scan,
    positions: &[f64],
    errors: &[f64],
    path: &Path,
) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "acquisition",
        "two_theta",
        "omega",
        "chi",
        "phi",
        "peak_pixel",
        "peak_std_error",
    ])?;

    for (ii, acq) in scan.acquisitions().iter().enumerate() {
        wtr.write_record(&[
            (ii + 1).to_string(),
            format!("{:.4}", acq.two_theta),
            format!("{:.4}", acq.omega),
            format!("{:.4}", acq.chi),
            format!("{:.4}", acq.phi),
            format!("{:.4}", to_report_pixel(positions[ii])),
            format!("{:.4}", errors[ii]),
        ])?;
    }

    wtr.flush().map_err(|e| XrdcalError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

fn print_estimate(variant: Variant, estimate: &AlignmentEstimate, pixel_size: f64) {
    let label = match variant {
        Variant::Horizontal => "Horizontal beam misalignment : e ",
        Variant::Vertical => "Vertical beam misalignment   : h ",
    };

    output::print_separator();
    output::print_success(&format!(
        "{} = {:.2} +- {:.2} pix / {:.3} +- {:.3} mm ({:.1} %)",
        label,
        estimate.offset,
        estimate.offset_std_error,
        estimate.offset_mm(pixel_size),
        estimate.offset_std_error_mm(pixel_size),
        estimate.relative_error_percent()
    ));
    output::print_result(
        "fitted peak position l0",
        to_report_pixel(estimate.reference),
        estimate.reference_std_error,
        "pix",
    );
}

fn execute(args: AlignArgs, variant: Variant) -> Result<()> {
    output::print_header(variant.title());

    let config = resolve_config(&args)?;
    let opts = SolveOptions::default();

    // 读扫描并剔除坏采集
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

    // 峰窗口: 外部 1 基闭区间 → 内部 0 基半开区间
    if config.window_min == 0 || config.window_max <= config.window_min {
        return Err(XrdcalError::InvalidConfiguration(format!(
            "peak window {}-{} (must be 1 <= min < max)",
            config.window_min, config.window_max
        )));
    }
    let window: Range<usize> = (config.window_min - 1)..config.window_max;

    // 全扫描共用的初始猜测
    let initial = guess::aggregate_guess(
        &scan,
        &window,
        config.background_left,
        config.background_right,
    )?;
    output::print_info(&format!(
        "Initial guess: x0 = {:.3} pix, IM = {:.3}, H = {:.3} pix, A = {:.3}, B = {:.3}",
        to_report_pixel(initial.center),
        initial.amplitude,
        initial.fwhm,
        initial.bg_intercept,
        initial.bg_slope
    ));

    // 逐采集峰拟合
    let results = peak::fit_scan_window(&scan, &window, &initial, args.jobs, &opts)?;
    let positions: Vec<f64> = results.iter().map(|r| r.params.center).collect();
    let errors: Vec<f64> = results.iter().map(|r| r.center_std_error()).collect();

    let angles = match variant {
        Variant::Horizontal => scan.omega_series(),
        Variant::Vertical => scan.chi_series(),
    };
    print_peak_table(variant, &angles, &positions);

    if let Some(path) = &config.peaks_csv {
        export_peaks_csv(&scan, &positions, &errors, path)?;
        output::print_success(&format!("Peak positions saved to '{}'", path.display()));
    }

    // 几何模型拟合，偏移从 0 出发，参考峰位取初始猜测的中心
    let estimate = match variant {
        Variant::Horizontal => align::fit_horizontal(
            &scan.two_theta_series(),
            &scan.omega_series(),
            &positions,
            initial.center,
            &opts,
        )?,
        Variant::Vertical => align::fit_vertical(
            &scan.two_theta_series(),
            &scan.omega_series(),
            &scan.chi_series(),
            &positions,
            initial.center,
            &opts,
        )?,
    };

    print_estimate(variant, &estimate, config.pixel_size);

    Ok(())
}
