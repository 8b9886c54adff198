//! # Seifert .TTX 扫描文件解析器
//!
//! 读写 1D 探测器扫描的定宽文本格式。
//!
//! ## .TTX 格式说明
//! ```text
//! File             : <path>
//! Number of points :  <N>
//! <列标题行>
//! ********************************
//! Scan Number :     1
//!    <2theta>    <omega>     <chi>    <X>    <Y>    <Z>    <phi>
//! Acq time    :   300
//!     <探测器角度标签>     <整数计数>      (共 N 行)
//! ********************************
//! ...
//! ```
//! 采集块以 32 个星号的分隔行开始；角度行中 X/Y/Z 三个轴字段不使用。
//! 探测器角度标签列在读入时保存在 [`Scan`] 上，重新写出时原样复用。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/scan.rs`

use crate::error::{Result, XrdcalError};
use crate::models::{Acquisition, Scan};
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// 采集块分隔行
const SEPARATOR: &str = "********************************";

/// 写出时使用的采集时间（秒），与参考仪器软件一致
const ACQ_TIME_S: u32 = 300;

fn parse_error(path: &Path, reason: impl Into<String>) -> XrdcalError {
    XrdcalError::ParseError {
        format: "TTX scan".to_string(),
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

/// 读取 .TTX 扫描文件
pub fn read_scan(path: &Path) -> Result<Scan> {
    if !path.exists() {
        return Err(XrdcalError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let content = fs::read_to_string(path).map_err(|e| XrdcalError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let lines: Vec<&str> = content.lines().collect();
    if lines.len() < 2 {
        return Err(parse_error(path, "missing global header"));
    }

    // 全局头第二行声明像素数: "Number of points :  N"
    let number_of_points: usize = lines[1]
        .split_whitespace()
        .nth(4)
        .and_then(|tok| tok.parse().ok())
        .ok_or_else(|| parse_error(path, "cannot read 'Number of points' header"))?;

    if number_of_points == 0 {
        return Err(parse_error(path, "declared point count is zero"));
    }

    // 按分隔行切块；第一块是全局头，丢弃
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in &lines {
        if line.trim() == SEPARATOR {
            blocks.push(current);
            current = Vec::new();
        } else {
            current.push(line);
        }
    }
    blocks.push(current);
    blocks.remove(0);

    if blocks.is_empty() {
        return Err(parse_error(path, "scan contains no acquisition blocks"));
    }

    let mut acquisitions = Vec::with_capacity(blocks.len());
    let mut pixel_labels: Vec<String> = Vec::new();

    for (ii, block) in blocks.iter().enumerate() {
        // 块结构: 扫描号行, 角度行, 采集时间行, N 条强度行
        if block.len() != number_of_points + 3 {
            return Err(parse_error(
                path,
                format!(
                    "acquisition {} has {} lines, expected {} for {} points",
                    ii + 1,
                    block.len(),
                    number_of_points + 3,
                    number_of_points
                ),
            ));
        }

        let angles: Vec<f64> = block[1]
            .split_whitespace()
            .map(|tok| tok.parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| {
                parse_error(path, format!("bad angle header in acquisition {}", ii + 1))
            })?;

        if angles.len() < 7 {
            return Err(parse_error(
                path,
                format!("angle header of acquisition {} has {} fields, expected 7", ii + 1, angles.len()),
            ));
        }

        let mut counts = Vec::with_capacity(number_of_points);
        for (jj, line) in block[3..].iter().enumerate() {
            let mut tokens = line.split_whitespace();
            let label = tokens.next().ok_or_else(|| {
                parse_error(path, format!("empty pixel line {} in acquisition {}", jj + 1, ii + 1))
            })?;

            let value: f64 = tokens.next().and_then(|tok| tok.parse().ok()).ok_or_else(|| {
                parse_error(
                    path,
                    format!("bad intensity at pixel {} of acquisition {}", jj + 1, ii + 1),
                )
            })?;
            counts.push(value);

            // 标签列在各采集间相同，只保留第一个采集的
            if ii == 0 {
                pixel_labels.push(label.to_string());
            }
        }

        acquisitions.push(Acquisition {
            two_theta: angles[0],
            omega: angles[1],
            chi: angles[2],
            phi: angles[6],
            counts,
        });
    }

    Scan::new(acquisitions, pixel_labels)
}

/// 写出 .TTX 扫描文件
pub fn write_scan(scan: &Scan, path: &Path) -> Result<()> {
    let mut file = File::create(path).map_err(|e| XrdcalError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    let write_err = |e: std::io::Error| XrdcalError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    };

    writeln!(file, "File             : {}", path.display()).map_err(write_err)?;
    writeln!(file, "Number of points :  {}", scan.pixel_count()).map_err(write_err)?;
    writeln!(
        file,
        "  2theta    theta     Chi       X        Y        Z        Phi"
    )
    .map_err(write_err)?;

    for (ii, acq) in scan.acquisitions().iter().enumerate() {
        writeln!(file, "{}", SEPARATOR).map_err(write_err)?;
        writeln!(file, "Scan Number :     {}", ii + 1).map_err(write_err)?;
        writeln!(
            file,
            "   {:5.3}    {:5.3}     {:5.3}    0.000    0.000    0.000    {:5.3}",
            acq.two_theta, acq.omega, acq.chi, acq.phi
        )
        .map_err(write_err)?;
        writeln!(file, "Acq time    :   {}", ACQ_TIME_S).map_err(write_err)?;

        // 强度按整数写出
        for (label, cts) in scan.pixel_labels().iter().zip(&acq.counts) {
            writeln!(file, "    {}     {}", label, *cts as i64).map_err(write_err)?;
        }
    }

    Ok(())
}
