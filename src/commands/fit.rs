//! # 拟合流程
//!
//! `bift` 与 `gnom` 共用的流程：读入曲线、选 q 范围、调用拟合函数、
//! 写出 CSV 与图表、打印结果表格；目录输入时并行批量处理并写汇总表。
//!
//! ## 输出文件（位于输出目录）
//! - `<stem>_pr.csv`、`<stem>_fit.csv`
//! - `<stem>_grid.csv`（有得分网格时）
//! - `<stem>.png` 或 `<stem>.svg`
//! - 批量模式另有 `summary.csv`
//!
//! ## 依赖关系
//! - 被 `commands/bift.rs`、`commands/gnom.rs` 调用
//! - 使用 `batch/` 并行处理，`tabled` 打印表格

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::common::{BatchArgs, OutputArgs, RangeArgs};
use crate::utils::output;
use crate::utils::progress::SearchProgress;
use saxsift::error::{IftError, Result};
use saxsift::export;
use saxsift::ift::{NoProgress, ProgressEvent, ProgressSink};
use saxsift::models::{IftResult, ScatteringCurve};
use saxsift::parsers;

use std::fs;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 一次运行的输入输出配置
pub struct FitJob<'a> {
    pub input: &'a Path,
    pub range: &'a RangeArgs,
    pub out: &'a OutputArgs,
    pub batch: &'a BatchArgs,
}

/// 按输入类型分派单文件或批量模式
///
/// `fitter` 给定曲线与进度接收端，返回拟合结果。
pub fn execute<F>(job: &FitJob<'_>, fitter: F) -> Result<()>
where
    F: Fn(&ScatteringCurve, &mut dyn ProgressSink) -> Result<IftResult> + Sync,
{
    if job.input.is_file() {
        execute_single_file(job, &fitter)
    } else if job.input.is_dir() {
        execute_batch(job, &fitter)
    } else {
        Err(IftError::FileNotFound {
            path: job.input.display().to_string(),
        })
    }
}

fn create_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| IftError::FileWriteError {
        path: dir.display().to_string(),
        source: e,
    })
}

/// 读入曲线并按索引截取
fn load_curve(path: &Path, range: &RangeArgs) -> Result<ScatteringCurve> {
    let curve = parsers::parse_dat_file(path)?;
    if range.qmin_index.is_none() && range.qmax_index.is_none() {
        return Ok(curve);
    }
    let start = range.qmin_index.unwrap_or(0);
    let end = range.qmax_index.unwrap_or(curve.len());
    curve.select_range(start, end)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("curve")
        .to_string()
}

/// 某条曲线的输出文件
struct OutputFiles {
    pr: PathBuf,
    fit: PathBuf,
    grid: PathBuf,
    plot: PathBuf,
}

impl OutputFiles {
    fn new(dir: &Path, stem: &str, svg: bool) -> Self {
        Self {
            pr: dir.join(format!("{}_pr.csv", stem)),
            fit: dir.join(format!("{}_fit.csv", stem)),
            grid: dir.join(format!("{}_grid.csv", stem)),
            plot: dir.join(format!("{}.{}", stem, if svg { "svg" } else { "png" })),
        }
    }
}

/// 写出一条曲线的全部结果，返回写出的文件
fn write_outputs(result: &IftResult, files: &OutputFiles, out: &OutputArgs) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    export::write_pr(result, &files.pr)?;
    written.push(files.pr.clone());

    export::write_fit(result, &files.fit)?;
    written.push(files.fit.clone());

    if let Some(grid) = &result.grid {
        export::write_grid(grid, &files.grid)?;
        written.push(files.grid.clone());
    }

    if !out.no_plot {
        export::generate_result_plot(result, &files.plot, out.width, out.height, out.svg)?;
        written.push(files.plot.clone());
    }

    Ok(written)
}

/// 单文件模式
fn execute_single_file<F>(job: &FitJob<'_>, fitter: &F) -> Result<()>
where
    F: Fn(&ScatteringCurve, &mut dyn ProgressSink) -> Result<IftResult> + Sync,
{
    output::print_info(&format!("Single file mode: '{}'", job.input.display()));

    let files = OutputFiles::new(&job.out.output, &file_stem(job.input), job.out.svg);
    if files.pr.exists() && !job.batch.overwrite {
        output::print_skip(&format!(
            "Output exists, use --overwrite to replace: {}",
            files.pr.display()
        ));
        return Ok(());
    }

    let curve = load_curve(job.input, job.range)?;
    output::print_success(&format!(
        "Loaded curve: {} ({} points, q = {:.4} - {:.4} 1/Å)",
        curve.name(),
        curve.len(),
        curve.q()[0],
        curve.q()[curve.len() - 1]
    ));

    let progress = SearchProgress::new();
    let mut sink = |event: &ProgressEvent| progress.handle(event);
    let fitted = fitter(&curve, &mut sink);
    progress.finish();
    let result = fitted?;

    report_warnings(&result);
    print_parameter_table(&result);
    if result.criteria.is_some() {
        print_criteria_table(&result);
    }

    create_output_dir(&job.out.output)?;
    for path in write_outputs(&result, &files, job.out)? {
        output::print_saved("Saved", &path);
    }

    output::print_done(&format!("{} fit of '{}' finished", result.algorithm, curve.name()));
    Ok(())
}

/// 批量处理模式
fn execute_batch<F>(job: &FitJob<'_>, fitter: &F) -> Result<()>
where
    F: Fn(&ScatteringCurve, &mut dyn ProgressSink) -> Result<IftResult> + Sync,
{
    output::print_info(&format!("Batch mode: directory '{}'", job.input.display()));

    let files = FileCollector::new(job.input.to_path_buf())
        .with_pattern(&job.batch.pattern)?
        .recursive(job.batch.recursive)
        .collect();

    if files.is_empty() {
        output::print_warning(&format!(
            "No matching files found with pattern '{}'",
            job.batch.pattern
        ));
        return Ok(());
    }

    output::print_info(&format!("Found {} curve files", files.len()));
    create_output_dir(&job.out.output)?;

    let runner = BatchRunner::new(job.batch.jobs);
    output::print_info(&format!("Using {} parallel jobs", runner.jobs()));

    let result = runner.run(files, |file| process_batch_file(file, job, fitter))?;

    if !result.outputs.is_empty() {
        let summary = job.out.output.join("summary.csv");
        export::write_summary(&result.outputs, &summary)?;
        print_summary_table(&result.outputs);
        output::print_saved("Summary", &summary);
    }

    output::print_separator();
    output::print_success(&format!(
        "Batch complete: {} success, {} skipped, {} failed",
        result.success(),
        result.skipped,
        result.failed()
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    Ok(())
}

/// 处理批量模式中的单个文件
fn process_batch_file<F>(input: &PathBuf, job: &FitJob<'_>, fitter: &F) -> ProcessResult<IftResult>
where
    F: Fn(&ScatteringCurve, &mut dyn ProgressSink) -> Result<IftResult> + Sync,
{
    let files = OutputFiles::new(&job.out.output, &file_stem(input), job.out.svg);
    if files.pr.exists() && !job.batch.overwrite {
        return ProcessResult::Skipped(format!("Output exists, skipping: {}", files.pr.display()));
    }

    let fitted = load_curve(input, job.range)
        .and_then(|curve| fitter(&curve, &mut NoProgress))
        .and_then(|result| write_outputs(&result, &files, job.out).map(|_| result));

    match fitted {
        Ok(result) => ProcessResult::Success(result),
        Err(e) => ProcessResult::Failed(input.display().to_string(), e.to_string()),
    }
}

fn report_warnings(result: &IftResult) {
    if result.degraded {
        output::print_warning("No finite score on the search grid, the prior distribution is returned");
    }
    if result.rg_squared_negative {
        output::print_warning("Rg² came out negative, Rg reports √|Rg²|");
    }
    if result.cancelled {
        output::print_warning("Search was cancelled, the best point so far is reported");
    }
}

fn format_estimate(value: f64, sd: Option<f64>, precision: usize) -> (String, String) {
    (
        format!("{:.*}", precision, value),
        sd.map(|s| format!("{:.*}", precision, s)).unwrap_or_else(|| "-".to_string()),
    )
}

/// 打印拟合参数表
fn print_parameter_table(result: &IftResult) {
    #[derive(Tabled)]
    struct ParameterRow {
        #[tabled(rename = "Parameter")]
        name: &'static str,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "MC ±σ")]
        sd: String,
    }

    let mc = result.uncertainty.as_ref();
    let row = |name, (value, sd)| ParameterRow { name, value, sd };

    let mut rows = vec![
        row("Dmax (Å)", format_estimate(result.dmax, mc.map(|u| u.dmax.sd), 2)),
        row("Rg (Å)", format_estimate(result.rg, mc.map(|u| u.rg.sd), 2)),
        ParameterRow {
            name: "I(0)",
            value: format!("{:.4e}", result.i0),
            sd: mc.map(|u| format!("{:.4e}", u.i0.sd)).unwrap_or_else(|| "-".to_string()),
        },
        ParameterRow {
            name: "alpha",
            value: format!("{:.4e}", result.alpha),
            sd: mc.map(|u| format!("{:.4e}", u.alpha.sd)).unwrap_or_else(|| "-".to_string()),
        },
        row("χ²", format_estimate(result.chi_squared, mc.map(|u| u.chi_squared.sd), 3)),
    ];
    if let Some(evidence) = result.evidence {
        rows.push(row("Evidence", format_estimate(evidence, mc.map(|u| u.evidence.sd), 3)));
    }
    if let Some(best) = &result.best_chi_squared {
        rows.push(ParameterRow {
            name: "Best χ² on grid",
            value: format!("{:.3}", best.chi_squared),
            sd: format!("α = {:.3e}, Dmax = {:.1}", best.alpha, best.dmax),
        });
    }

    output::print_header(&format!("{} Result: {}", result.algorithm, result.name()));
    println!("{}", Table::new(&rows));
    if let Some(u) = mc {
        output::print_info(&format!("Monte Carlo: {} samples", u.runs));
    }
}

/// 打印 GNOM 判据表
fn print_criteria_table(result: &IftResult) {
    #[derive(Tabled)]
    struct CriterionRow {
        #[tabled(rename = "Criterion")]
        name: &'static str,
        #[tabled(rename = "Value")]
        value: String,
    }

    let Some(c) = result.criteria else {
        return;
    };

    let rows: Vec<CriterionRow> = [
        ("DISCRP", c.discrp),
        ("OSCILL", c.oscill),
        ("STABIL", c.stabil),
        ("SYSDEV", c.sysdev),
        ("POSITV", c.positv),
        ("VALCEN", c.valcen),
        ("TOTAL", c.total),
    ]
    .into_iter()
    .map(|(name, value)| CriterionRow {
        name,
        value: format!("{:.4}", value),
    })
    .collect();

    output::print_header("Perceptual Criteria");
    println!("{}", Table::new(&rows));
}

/// 打印批量汇总表
fn print_summary_table(results: &[IftResult]) {
    #[derive(Tabled)]
    struct SummaryRow {
        #[tabled(rename = "Curve")]
        name: String,
        #[tabled(rename = "Dmax (Å)")]
        dmax: String,
        #[tabled(rename = "Rg (Å)")]
        rg: String,
        #[tabled(rename = "I(0)")]
        i0: String,
        #[tabled(rename = "χ²")]
        chi_squared: String,
        #[tabled(rename = "Status")]
        status: &'static str,
    }

    let rows: Vec<SummaryRow> = results
        .iter()
        .map(|r| SummaryRow {
            name: r.name().to_string(),
            dmax: format!("{:.2}", r.dmax),
            rg: format!("{:.2}", r.rg),
            i0: format!("{:.4e}", r.i0),
            chi_squared: format!("{:.3}", r.chi_squared),
            status: if r.is_reliable() { "ok" } else { "check" },
        })
        .collect();

    output::print_header(&format!("Batch Summary ({} curves)", rows.len()));
    println!("{}", Table::new(&rows));
}
