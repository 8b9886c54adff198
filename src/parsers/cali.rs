//! # .CALI 角度校正表解析器
//!
//! 读写探测器每像素角度校正的固定文本格式。
//!
//! ## .CALI 格式说明
//! ```text
//! file             : <path>
//!
//! Calibration of Inel detector
//!
//! angle correction in function of the pixel
//!   1     -1.2346e-03
//!   2     -1.1097e-03
//!   ...
//! ```
//! 头部固定 5 行（路径回显、空行、标题、空行、列标题），其后每行一个像素：
//! 从 1 开始的像素编号与科学计数法校正值。读取时跳过头 5 行，取每行第二列。
//! 数值列的写出格式与参考仪器软件逐字节一致（符号、4 位小数、两位指数）。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/calibration.rs`

use crate::error::{Result, XrdcalError};
use crate::models::CalibrationTable;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// 头部行数，读取时跳过
const HEADER_LINES: usize = 5;

/// 按 C 语言 `%.4e` 的样式格式化：4 位小数尾数 + 带符号两位指数。
///
/// 例: `1.2346e-03`, `-5.0000e+00`, `0.0000e+00`
fn format_scientific(value: f64) -> String {
    if value == 0.0 {
        return "0.0000e+00".to_string();
    }

    let mut exponent = value.abs().log10().floor() as i32;
    let mut mantissa = value / 10f64.powi(exponent);

    // 尾数四舍五入后可能进位到 10.0000
    if format!("{:.4}", mantissa.abs()).starts_with("10") {
        mantissa /= 10.0;
        exponent += 1;
    }

    let exp_sign = if exponent < 0 { '-' } else { '+' };
    format!("{:.4}e{}{:02}", mantissa, exp_sign, exponent.abs())
}

/// 读取 .CALI 校正表文件
pub fn read_table(path: &Path) -> Result<CalibrationTable> {
    if !path.exists() {
        return Err(XrdcalError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let content = fs::read_to_string(path).map_err(|e| XrdcalError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut corrections = Vec::new();
    for (ii, line) in content.lines().enumerate().skip(HEADER_LINES) {
        if line.trim().is_empty() {
            continue;
        }

        let value: f64 = line
            .split_whitespace()
            .nth(1)
            .and_then(|tok| tok.parse().ok())
            .ok_or_else(|| XrdcalError::ParseError {
                format: "CALI".to_string(),
                path: path.display().to_string(),
                reason: format!("bad correction entry at line {}", ii + 1),
            })?;
        corrections.push(value);
    }

    CalibrationTable::new(corrections).map_err(|_| XrdcalError::ParseError {
        format: "CALI".to_string(),
        path: path.display().to_string(),
        reason: "file contains no correction entries".to_string(),
    })
}

/// 写出 .CALI 校正表文件
pub fn write_table(table: &CalibrationTable, path: &Path) -> Result<()> {
    let mut file = File::create(path).map_err(|e| XrdcalError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    let write_err = |e: std::io::Error| XrdcalError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    };

    writeln!(file, "file             : {}", path.display()).map_err(write_err)?;
    writeln!(file).map_err(write_err)?;
    writeln!(file, "Calibration of Inel detector").map_err(write_err)?;
    writeln!(file).map_err(write_err)?;
    writeln!(file, "angle correction in function of the pixel").map_err(write_err)?;

    for (pixel, correction) in table.entries() {
        writeln!(file, "  {}     {}", pixel, format_scientific(correction)).map_err(write_err)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_format_scientific_matches_reference_layout() {
        assert_eq!(format_scientific(0.0012346), "1.2346e-03");
        assert_eq!(format_scientific(-5.0), "-5.0000e+00");
        assert_eq!(format_scientific(0.0), "0.0000e+00");
        assert_eq!(format_scientific(123.456), "1.2346e+02");
        assert_eq!(format_scientific(-0.09999999), "-1.0000e-01");
    }

    #[test]
    fn test_format_scientific_carries_mantissa_overflow() {
        // 9.99996e-3 四舍五入后尾数进位
        assert_eq!(format_scientific(9.99996e-3), "1.0000e-02");
    }

    #[test]
    fn test_table_roundtrip_preserves_formatted_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detector.CALI");

        let corrections = vec![-12.017, -11.92135, 0.0, 0.0433, 11.578];
        let table = CalibrationTable::new(corrections.clone()).unwrap();

        write_table(&table, &path).unwrap();
        let restored = read_table(&path).unwrap();

        assert_eq!(restored.len(), corrections.len());
        for (value, original) in restored.corrections().iter().zip(&corrections) {
            // 写出保留 4 位小数尾数，往返误差在第 5 位有效数字以内
            assert_relative_eq!(*value, *original, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_written_numeric_column_rereads_byte_exact() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.CALI");
        let second = dir.path().join("b.CALI");

        let table = CalibrationTable::new(vec![-1.2345678e-2, 3.14159, 0.5]).unwrap();
        write_table(&table, &first).unwrap();

        // 读回再写出，数值列必须逐字节一致
        let restored = read_table(&first).unwrap();
        write_table(&restored, &second).unwrap();

        let column = |path: &Path| -> Vec<String> {
            fs::read_to_string(path)
                .unwrap()
                .lines()
                .skip(HEADER_LINES)
                .map(|line| line.split_whitespace().nth(1).unwrap().to_string())
                .collect()
        };
        assert_eq!(column(&first), column(&second));
    }

    #[test]
    fn test_missing_file_is_typed_error() {
        let err = read_table(Path::new("no_such.CALI"));
        assert!(matches!(err, Err(XrdcalError::FileNotFound { .. })));
    }
}
