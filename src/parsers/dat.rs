//! # 三列 ASCII 曲线解析器
//!
//! 读取 q、I(q)、σ(q) 三列的纯文本曲线。
//!
//! ## 格式说明
//! ```text
//! # 任意注释或表头
//! q            I            sigma
//! 1.0000e-02   9.8123e+02   5.0000e-01
//! 1.2000e-02   9.7911e+02   5.0000e-01
//! ```
//! - 列之间用空白、逗号或分号分隔，第四列及之后的列被忽略
//! - 不以三个数字开头的行（注释、表头、页脚）跳过
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/curve.rs`
//! - 使用 regex 识别数据行

use crate::error::{IftError, Result};
use crate::models::ScatteringCurve;

use regex::Regex;
use std::fs;
use std::path::Path;

/// 浮点数（含科学计数法）
const NUMBER: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

/// 解析曲线文件，曲线名取文件名（不含扩展名）
pub fn parse_dat_file(path: &Path) -> Result<ScatteringCurve> {
    let content = fs::read_to_string(path).map_err(|e| IftError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    parse_dat_content(&content, name).map_err(|e| match e {
        IftError::ParseError { format, reason, .. } => IftError::ParseError {
            format,
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// 从字符串内容解析曲线
pub fn parse_dat_content(content: &str, name: &str) -> Result<ScatteringCurve> {
    let row = Regex::new(&format!(
        r"^\s*({n})[\s,;]+({n})[\s,;]+({n})(?:[\s,;]|$)",
        n = NUMBER
    ))
    .map_err(|e| IftError::Other(format!("invalid data row pattern: {}", e)))?;

    let mut q = Vec::new();
    let mut intensity = Vec::new();
    let mut sigma = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let caps = match row.captures(line) {
            Some(caps) => caps,
            None => continue,
        };

        let mut values = [0.0; 3];
        for (k, value) in values.iter_mut().enumerate() {
            *value = caps[k + 1].parse().map_err(|_| IftError::ParseError {
                format: "dat".to_string(),
                path: name.to_string(),
                reason: format!("line {}: cannot parse '{}'", line_no + 1, &caps[k + 1]),
            })?;
        }

        q.push(values[0]);
        intensity.push(values[1]);
        sigma.push(values[2]);
    }

    if q.is_empty() {
        return Err(IftError::ParseError {
            format: "dat".to_string(),
            path: name.to_string(),
            reason: "no numeric q / I / sigma rows found".to_string(),
        });
    }

    ScatteringCurve::new(name, q, intensity, sigma)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
### sample curve
# q I sigma
q, I, err
0.010  100.0  0.5
0.020, 90.0, 0.5, 1
0.030;80.0;0.4
1.5e-1 2.5E+1 1e-1
footer text
";

    #[test]
    fn test_parse_skips_headers() {
        let curve = parse_dat_content(SAMPLE, "sample").unwrap();
        assert_eq!(curve.name(), "sample");
        assert_eq!(curve.q(), &[0.01, 0.02, 0.03, 0.15]);
        assert_eq!(curve.intensity(), &[100.0, 90.0, 80.0, 25.0]);
        assert_eq!(curve.sigma(), &[0.5, 0.5, 0.4, 0.1]);
    }

    #[test]
    fn test_parse_rejects_empty() {
        let err = parse_dat_content("# nothing here\n", "empty").unwrap_err();
        assert!(matches!(err, IftError::ParseError { .. }));
    }

    #[test]
    fn test_parse_rejects_zero_sigma() {
        let content = "0.01 1.0 0.1\n0.02 1.0 0.0\n0.03 1.0 0.1\n";
        assert!(matches!(
            parse_dat_content(content, "bad"),
            Err(IftError::InvalidCurve(_))
        ));
    }

    #[test]
    fn test_parse_file_round_trip() {
        let path = std::env::temp_dir().join("saxsift_parse_test.dat");
        fs::write(&path, SAMPLE).unwrap();
        let curve = parse_dat_file(&path).unwrap();
        assert_eq!(curve.name(), "saxsift_parse_test");
        assert_eq!(curve.len(), 4);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file() {
        let err = parse_dat_file(Path::new("/nonexistent/curve.dat")).unwrap_err();
        assert!(matches!(err, IftError::FileReadError { .. }));
    }
}
