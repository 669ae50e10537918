//! # gnom 子命令实现
//!
//! 固定 Dmax，按 TOTAL 判据搜索 α；给定 `--alpha` 时只做单点求解。
//!
//! ## 依赖关系
//! - 使用 `cli/gnom.rs` 定义的 GnomArgs
//! - 使用 `commands/fit.rs` 的通用流程
//! - 使用 `saxsift::ift` 的搜索入口

use super::fit::{self, FitJob};
use crate::cli::gnom::GnomArgs;
use crate::utils::output;
use saxsift::error::Result;
use saxsift::ift::{gnom_search, single_solve_gnom, CancelToken, ChiReference, GnomSettings};

/// 由命令行参数构造 GNOM 配置
fn build_settings(args: &GnomArgs) -> GnomSettings {
    let mut settings = GnomSettings::new(args.dmax);
    settings.pr_points = args.pr_points;
    settings.dmin = args.dmin;
    settings.min_alpha = args.min_alpha;
    settings.max_alpha = args.max_alpha;
    settings.alpha_points = args.alpha_points;
    settings.force_ends_zero = !args.free_ends;
    settings.refine.enabled = !args.no_refine;
    settings.refine_dmax = args.refine_dmax;
    if args.optimal_chi {
        settings.chi_reference = ChiReference::Optimal;
    }
    settings
}

/// 执行 GNOM 分析
pub fn execute(args: GnomArgs) -> Result<()> {
    output::print_header("GNOM-style Indirect Fourier Transform");

    let settings = build_settings(&args);
    let job = FitJob {
        input: &args.input,
        range: &args.range,
        out: &args.out,
        batch: &args.batch,
    };

    output::print_info(&format!(
        "Dmax = {:.2} Å, Dmin = {:.2} Å, N = {}, ends {}",
        settings.dmax,
        settings.dmin,
        settings.pr_points,
        if settings.force_ends_zero { "pinned to zero" } else { "free" }
    ));

    if let Some(alpha) = args.alpha {
        output::print_info(&format!("Single solve at alpha = {:.4e}", alpha));
        return fit::execute(&job, |curve, _progress| single_solve_gnom(curve, alpha, &settings));
    }

    output::print_info(&format!(
        "Grid: {} x alpha in [{:.3e}, {:.3e}]",
        settings.alpha_points, settings.min_alpha, settings.max_alpha
    ));

    let cancel = CancelToken::new();
    fit::execute(&job, |curve, progress| {
        gnom_search(curve, &settings, &cancel, progress)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn parse(argv: &[&str]) -> GnomArgs {
        match Cli::parse_from(argv).command {
            Commands::Gnom(args) => args,
            _ => panic!("expected the gnom subcommand"),
        }
    }

    #[test]
    fn test_defaults_match_library() {
        let args = parse(&["saxsift", "gnom", "curve.dat", "--dmax", "60"]);
        assert_eq!(build_settings(&args), GnomSettings::new(60.0));
    }

    #[test]
    fn test_dmax_is_required() {
        assert!(Cli::try_parse_from(["saxsift", "gnom", "curve.dat"]).is_err());
    }

    #[test]
    fn test_flags() {
        let args = parse(&[
            "saxsift",
            "gnom",
            "curve.dat",
            "--dmax",
            "60",
            "--free-ends",
            "--optimal-chi",
            "--refine-dmax",
        ]);
        let settings = build_settings(&args);
        assert!(!settings.force_ends_zero);
        assert!(settings.refine_dmax);
        assert_eq!(settings.chi_reference, ChiReference::Optimal);
    }
}
