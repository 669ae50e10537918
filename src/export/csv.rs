//! # CSV 与文本导出
//!
//! ## 输出文件
//! - P(r): r, p(r)[, error]
//! - 拟合: q, I, sigma, I_fit
//! - 得分网格: dmax, ln_alpha, alpha, score（长表，便于画热图）
//! - 汇总: 每条曲线一行，由 serde 序列化
//! - 曲线: 带注释头的三列文本，可被 `parsers::dat` 读回
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `csv` 库与 serde

use crate::error::{IftError, Result};
use crate::models::{IftResult, ScatteringCurve, ScoreGrid};

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn write_error(path: &Path, e: std::io::Error) -> IftError {
    IftError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    }
}

fn finish<W: Write>(mut wtr: csv::Writer<W>, path: &Path) -> Result<()> {
    wtr.flush().map_err(|e| write_error(path, e))
}

/// 导出 P(r)
pub fn write_pr(result: &IftResult, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    match &result.pr_error {
        Some(error) => {
            wtr.write_record(["r", "pr", "error"])?;
            for ((r, p), e) in result.r.iter().zip(&result.pr).zip(error) {
                wtr.write_record(&[format!("{:.6}", r), format!("{:.6e}", p), format!("{:.6e}", e)])?;
            }
        }
        None => {
            wtr.write_record(["r", "pr"])?;
            for (r, p) in result.r.iter().zip(&result.pr) {
                wtr.write_record(&[format!("{:.6}", r), format!("{:.6e}", p)])?;
            }
        }
    }

    finish(wtr, output_path)
}

/// 导出数据与拟合曲线
pub fn write_fit(result: &IftResult, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    wtr.write_record(["q", "intensity", "sigma", "fit"])?;

    let data = &result.data;
    for i in 0..data.len() {
        wtr.write_record(&[
            format!("{:.6e}", data.q()[i]),
            format!("{:.6e}", data.intensity()[i]),
            format!("{:.6e}", data.sigma()[i]),
            format!("{:.6e}", result.fit[i]),
        ])?;
    }

    finish(wtr, output_path)
}

/// 导出得分网格（未计算的点留空）
pub fn write_grid(grid: &ScoreGrid, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    wtr.write_record(["dmax", "ln_alpha", "alpha", "score"])?;

    for (d, dmax) in grid.dmax_points.iter().enumerate() {
        for (a, log_alpha) in grid.log_alpha_points.iter().enumerate() {
            let score = grid.scores[d][a];
            wtr.write_record(&[
                format!("{:.4}", dmax),
                format!("{:.6}", log_alpha),
                format!("{:.6e}", log_alpha.exp()),
                if score.is_finite() {
                    format!("{:.6}", score)
                } else {
                    String::new()
                },
            ])?;
        }
    }

    finish(wtr, output_path)
}

/// 汇总表的一行
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    name: &'a str,
    algorithm: String,
    dmax: f64,
    alpha: f64,
    rg: f64,
    i0: f64,
    chi_squared: f64,
    evidence: Option<f64>,
    total: Option<f64>,
    dmax_sd: Option<f64>,
    rg_sd: Option<f64>,
    degraded: bool,
    rg_squared_negative: bool,
    cancelled: bool,
}

impl<'a> From<&'a IftResult> for SummaryRow<'a> {
    fn from(result: &'a IftResult) -> Self {
        SummaryRow {
            name: result.name(),
            algorithm: result.algorithm.to_string(),
            dmax: result.dmax,
            alpha: result.alpha,
            rg: result.rg,
            i0: result.i0,
            chi_squared: result.chi_squared,
            evidence: result.evidence,
            total: result.criteria.map(|c| c.total),
            dmax_sd: result.uncertainty.as_ref().map(|u| u.dmax.sd),
            rg_sd: result.uncertainty.as_ref().map(|u| u.rg.sd),
            degraded: result.degraded,
            rg_squared_negative: result.rg_squared_negative,
            cancelled: result.cancelled,
        }
    }
}

/// 导出多条曲线的结果汇总
pub fn write_summary(results: &[IftResult], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;
    for result in results {
        wtr.serialize(SummaryRow::from(result))?;
    }
    finish(wtr, output_path)
}

/// 把曲线写成三列文本
pub fn write_curve(curve: &ScatteringCurve, output_path: &Path) -> Result<()> {
    let file = File::create(output_path).map_err(|e| write_error(output_path, e))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "# {}", curve.name()).map_err(|e| write_error(output_path, e))?;
    writeln!(out, "# q\tI\tsigma").map_err(|e| write_error(output_path, e))?;
    for i in 0..curve.len() {
        writeln!(
            out,
            "{:.8e}\t{:.8e}\t{:.8e}",
            curve.q()[i],
            curve.intensity()[i],
            curve.sigma()[i]
        )
        .map_err(|e| write_error(output_path, e))?;
    }

    out.flush().map_err(|e| write_error(output_path, e))
}
