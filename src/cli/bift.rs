//! # bift 子命令 CLI 定义
//!
//! 参数默认值与 `saxsift::ift::BiftSearch::default()` 一致。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/bift.rs`

use super::common::{BatchArgs, OutputArgs, RangeArgs};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// evidence 形式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum EvidenceArg {
    /// Full evidence including the determinant terms
    #[default]
    Full,
    /// alpha*S - chi^2/2 only
    Simplified,
}

/// bift 子命令参数
#[derive(Args, Debug)]
pub struct BiftArgs {
    /// Input: curve file (q, I, sigma) or directory of curve files
    pub input: PathBuf,

    /// Number of P(r) points
    #[arg(short = 'n', long, default_value_t = 50)]
    pub pr_points: usize,

    /// Smallest alpha in the search grid
    #[arg(long, default_value_t = 150.0)]
    pub min_alpha: f64,

    /// Largest alpha in the search grid
    #[arg(long, default_value_t = 1e10)]
    pub max_alpha: f64,

    /// Number of alpha grid points (log spaced)
    #[arg(long, default_value_t = 16)]
    pub alpha_points: usize,

    /// Smallest Dmax in the search grid (Å)
    #[arg(long, default_value_t = 10.0)]
    pub min_dmax: f64,

    /// Largest Dmax in the search grid (Å)
    #[arg(long, default_value_t = 400.0)]
    pub max_dmax: f64,

    /// Number of Dmax grid points
    #[arg(long, default_value_t = 10)]
    pub dmax_points: usize,

    /// Evidence used to rank (alpha, Dmax) pairs
    #[arg(long, value_enum, default_value = "full")]
    pub evidence: EvidenceArg,

    /// Maximum fixed-point iterations per solve
    #[arg(long, default_value_t = 1000)]
    pub max_iterations: usize,

    /// Skip the Nelder-Mead refinement after the grid search
    #[arg(long, default_value_t = false)]
    pub no_refine: bool,

    /// Maximum Nelder-Mead iterations
    #[arg(long, default_value_t = 400)]
    pub refine_iterations: u64,

    /// Number of Monte Carlo samples for error estimates (0 = off)
    #[arg(long, default_value_t = 300)]
    pub mc_runs: usize,

    /// Random seed for the Monte Carlo sampling
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Solve once at this alpha instead of searching (requires --dmax)
    #[arg(long, requires = "dmax")]
    pub alpha: Option<f64>,

    /// Dmax for a single solve (requires --alpha)
    #[arg(long, requires = "alpha")]
    pub dmax: Option<f64>,

    #[command(flatten)]
    pub range: RangeArgs,

    #[command(flatten)]
    pub out: OutputArgs,

    #[command(flatten)]
    pub batch: BatchArgs,
}
