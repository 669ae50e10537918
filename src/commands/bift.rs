//! # bift 子命令实现
//!
//! 由命令行参数构造 `BiftSearch`，对每条曲线执行网格搜索、精修与
//! Monte Carlo 误差估计；给定 `--alpha --dmax` 时只做单点求解。
//!
//! ## 依赖关系
//! - 使用 `cli/bift.rs` 定义的 BiftArgs
//! - 使用 `commands/fit.rs` 的通用流程
//! - 使用 `saxsift::ift` 的搜索入口

use super::fit::{self, FitJob};
use crate::cli::bift::{BiftArgs, EvidenceArg};
use crate::utils::output;
use saxsift::error::Result;
use saxsift::ift::{
    bift_search, single_solve_bift, BiftSearch, BiftSettings, CancelToken, EvidenceMode,
    MonteCarloSettings, RefineSettings,
};

impl From<EvidenceArg> for EvidenceMode {
    fn from(arg: EvidenceArg) -> Self {
        match arg {
            EvidenceArg::Full => EvidenceMode::Full,
            EvidenceArg::Simplified => EvidenceMode::Simplified,
        }
    }
}

/// 由命令行参数构造搜索配置
fn build_search(args: &BiftArgs) -> BiftSearch {
    BiftSearch {
        pr_points: args.pr_points,
        min_alpha: args.min_alpha,
        max_alpha: args.max_alpha,
        alpha_points: args.alpha_points,
        min_dmax: args.min_dmax,
        max_dmax: args.max_dmax,
        dmax_points: args.dmax_points,
        evidence_mode: args.evidence.into(),
        solver: BiftSettings {
            max_iterations: args.max_iterations,
            ..BiftSettings::default()
        },
        refine: RefineSettings {
            enabled: !args.no_refine,
            max_iterations: args.refine_iterations,
            ..RefineSettings::default()
        },
        monte_carlo: MonteCarloSettings {
            runs: args.mc_runs,
            seed: args.seed,
            ..MonteCarloSettings::default()
        },
    }
}

/// 执行 BIFT 分析
pub fn execute(args: BiftArgs) -> Result<()> {
    output::print_header("Bayesian Indirect Fourier Transform");

    let job = FitJob {
        input: &args.input,
        range: &args.range,
        out: &args.out,
        batch: &args.batch,
    };

    if let (Some(alpha), Some(dmax)) = (args.alpha, args.dmax) {
        output::print_info(&format!(
            "Single solve at alpha = {:.4e}, Dmax = {:.2} Å, N = {}",
            alpha, dmax, args.pr_points
        ));
        let n = args.pr_points;
        return fit::execute(&job, move |curve, _progress| {
            single_solve_bift(curve, alpha, dmax, n)
        });
    }

    let search = build_search(&args);
    output::print_info(&format!(
        "Grid: {} x alpha in [{:.3e}, {:.3e}], {} x Dmax in [{:.1}, {:.1}] Å, N = {}",
        search.alpha_points,
        search.min_alpha,
        search.max_alpha,
        search.dmax_points,
        search.min_dmax,
        search.max_dmax,
        search.pr_points
    ));
    if search.monte_carlo.runs > 0 {
        output::print_info(&format!(
            "Monte Carlo: {} samples (seed {})",
            search.monte_carlo.runs, search.monte_carlo.seed
        ));
    }

    let cancel = CancelToken::new();
    fit::execute(&job, |curve, progress| {
        bift_search(curve, &search, &cancel, progress)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn parse(argv: &[&str]) -> BiftArgs {
        match Cli::parse_from(argv).command {
            Commands::Bift(args) => args,
            _ => panic!("expected the bift subcommand"),
        }
    }

    #[test]
    fn test_defaults_match_library() {
        let args = parse(&["saxsift", "bift", "curve.dat"]);
        assert_eq!(build_search(&args), BiftSearch::default());
    }

    #[test]
    fn test_options_reach_search() {
        let args = parse(&[
            "saxsift",
            "bift",
            "curve.dat",
            "--mc-runs",
            "0",
            "--no-refine",
            "--evidence",
            "simplified",
            "--max-dmax",
            "200",
        ]);
        let search = build_search(&args);
        assert_eq!(search.monte_carlo.runs, 0);
        assert!(!search.refine.enabled);
        assert_eq!(search.evidence_mode, EvidenceMode::Simplified);
        assert_eq!(search.max_dmax, 200.0);
    }

    #[test]
    fn test_single_solve_needs_both_parameters() {
        assert!(Cli::try_parse_from(["saxsift", "bift", "curve.dat", "--alpha", "100"]).is_err());
        let args = parse(&["saxsift", "bift", "curve.dat", "--alpha", "100", "--dmax", "50"]);
        assert_eq!((args.alpha, args.dmax), (Some(100.0), Some(50.0)));
    }
}
