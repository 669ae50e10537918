//! # IFT 结果图表
//!
//! 使用 `plotters` 生成左右两栏的结果图：
//! - 左栏: P(r)，有 Monte Carlo 误差时画 ±σ 误差带
//! - 右栏: I(q) 数据与拟合曲线，对数纵轴（只画正值）
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `models/result.rs` 的 IftResult

use crate::error::{IftError, Result};
use crate::models::IftResult;

use plotters::prelude::*;
use std::path::Path;

fn plot_error<E: std::fmt::Debug>(e: E) -> IftError {
    IftError::PlotError(format!("{:?}", e))
}

/// 生成结果图 (PNG 或 SVG)
pub fn generate_result_plot(
    result: &IftResult,
    output_path: &Path,
    width: u32,
    height: u32,
    use_svg: bool,
) -> Result<()> {
    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_result_chart(&root, result)?;
        root.present().map_err(plot_error)?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_result_chart(&root, result)?;
        root.present().map_err(plot_error)?;
    }
    Ok(())
}

/// P(r) 纵轴范围（含误差带，并包含 0）
fn pr_range(pr: &[f64], error: Option<&[f64]>) -> (f64, f64) {
    let mut lo = 0.0_f64;
    let mut hi = 0.0_f64;
    for (i, p) in pr.iter().enumerate() {
        let e = error.and_then(|e| e.get(i)).copied().unwrap_or(0.0);
        if (p - e).is_finite() {
            lo = lo.min(p - e);
        }
        if (p + e).is_finite() {
            hi = hi.max(p + e);
        }
    }
    if hi <= lo {
        hi = lo + 1.0;
    }
    let pad = 0.05 * (hi - lo);
    (if lo < 0.0 { lo - pad } else { 0.0 }, hi + pad)
}

/// 对数纵轴范围：所有正的有限值的上下界，各外扩一倍
fn log_range(series: &[&[f64]]) -> (f64, f64) {
    let positive = series
        .iter()
        .flat_map(|s| s.iter())
        .copied()
        .filter(|v| *v > 0.0 && v.is_finite());
    let (lo, hi) = positive.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (1e-3, 1.0);
    }
    (lo / 2.0, hi * 2.0)
}

/// 绘制结果图的核心逻辑
fn draw_result_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    result: &IftResult,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_error)?;

    let panels = root.split_evenly((1, 2));
    draw_pr_panel(&panels[0], result)?;
    draw_fit_panel(&panels[1], result)?;

    Ok(())
}

fn draw_pr_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    result: &IftResult,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let error = result.pr_error.as_deref();
    let (y_min, y_max) = pr_range(&result.pr, error);
    let x_max = if result.dmax > 0.0 { result.dmax } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .caption(
            format!("{} P(r): Dmax = {:.1} Å", result.algorithm, result.dmax),
            ("sans-serif", 22).into_font(),
        )
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, y_min..y_max)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("r (Å)")
        .y_desc("P(r)")
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_error)?;

    let line_color = RGBColor(0, 102, 204);

    if let Some(error) = error {
        let upper = result.r.iter().zip(&result.pr).zip(error).map(|((r, p), e)| (*r, p + e));
        let lower = result.r.iter().zip(&result.pr).zip(error).rev().map(|((r, p), e)| (*r, p - e));
        let band: Vec<(f64, f64)> = upper.chain(lower).collect();
        chart
            .draw_series(std::iter::once(Polygon::new(band, line_color.mix(0.2))))
            .map_err(plot_error)?;
    }

    chart
        .draw_series(LineSeries::new(
            result.r.iter().zip(&result.pr).map(|(r, p)| (*r, *p)),
            line_color.stroke_width(2),
        ))
        .map_err(plot_error)?;

    let rg_text = format!("Rg = {:.2} Å   I(0) = {:.3e}", result.rg, result.i0);
    chart
        .draw_series(std::iter::once(Text::new(
            rg_text,
            (0.05 * x_max, y_max - 0.05 * (y_max - y_min)),
            ("sans-serif", 14).into_font().color(&BLACK),
        )))
        .map_err(plot_error)?;

    Ok(())
}

fn draw_fit_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    result: &IftResult,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let data = &result.data;
    let q = data.q();
    let q_min = q.first().copied().unwrap_or(0.0);
    let q_max = q.last().copied().unwrap_or(1.0);
    let (y_min, y_max) = log_range(&[data.intensity(), &result.fit]);

    let mut chart = ChartBuilder::on(area)
        .caption(
            format!("{}: χ² = {:.3}", result.name(), result.chi_squared),
            ("sans-serif", 22).into_font(),
        )
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(q_min..q_max, (y_min..y_max).log_scale())
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("q (1/Å)")
        .y_desc("I(q)")
        .y_label_formatter(&|v| format!("{:.0e}", v))
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_error)?;

    let data_color = RGBColor(120, 120, 120);
    chart
        .draw_series(
            q.iter()
                .zip(data.intensity())
                .filter(|(_, i)| **i > 0.0)
                .map(|(q, i)| Circle::new((*q, *i), 2, data_color.filled())),
        )
        .map_err(plot_error)?
        .label("data")
        .legend(move |(x, y)| Circle::new((x + 10, y), 3, data_color.filled()));

    let fit_color = RGBColor(204, 51, 0);
    chart
        .draw_series(LineSeries::new(
            q.iter()
                .zip(&result.fit)
                .filter(|(_, f)| **f > 0.0)
                .map(|(q, f)| (*q, *f)),
            fit_color.stroke_width(2),
        ))
        .map_err(plot_error)?
        .label("fit")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], fit_color.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 14))
        .draw()
        .map_err(plot_error)?;

    Ok(())
}
