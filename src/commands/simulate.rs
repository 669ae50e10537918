//! # simulate 子命令实现
//!
//! 生成球体的合成散射曲线（可加高斯噪声），写成三列文本。
//!
//! ## 依赖关系
//! - 使用 `cli/simulate.rs` 定义的 SimulateArgs
//! - 使用 `saxsift::ift::simulate` 与 `saxsift::export`

use crate::cli::simulate::SimulateArgs;
use crate::utils::output;
use saxsift::error::{IftError, Result};
use saxsift::export;
use saxsift::ift::matrix::linspace;
use saxsift::ift::simulate::{sphere_curve, sphere_radius_of_gyration};

/// 执行曲线模拟
pub fn execute(args: SimulateArgs) -> Result<()> {
    output::print_header("Synthetic Sphere Curve");

    if args.output.exists() && !args.overwrite {
        output::print_skip(&format!(
            "Output exists, use --overwrite to replace: {}",
            args.output.display()
        ));
        return Ok(());
    }

    if !(args.q_min > 0.0) || !(args.q_max > args.q_min) {
        return Err(IftError::InvalidRange(format!(
            "q range {} - {} (must be 0 < q_min < q_max)",
            args.q_min, args.q_max
        )));
    }

    let q = linspace(args.q_min, args.q_max, args.points);
    let seed = if args.noiseless { None } else { Some(args.seed) };
    let curve = sphere_curve(&q, args.dmax, args.scale, args.noise, seed)?;

    output::print_info(&format!(
        "Sphere: Dmax = {:.2} Å, Rg = {:.3} Å, scale = {:.3e}",
        args.dmax,
        sphere_radius_of_gyration(args.dmax),
        args.scale
    ));
    output::print_info(&format!(
        "{} points, q = {:.4} - {:.4} 1/Å, noise σ = {}{}",
        curve.len(),
        args.q_min,
        args.q_max,
        args.noise,
        if args.noiseless { " (not applied)" } else { "" }
    ));

    export::write_curve(&curve, &args.output)?;
    output::print_saved("Curve", &args.output);

    Ok(())
}
