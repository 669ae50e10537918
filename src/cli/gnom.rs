//! # gnom 子命令 CLI 定义
//!
//! 参数默认值与 `saxsift::ift::GnomSettings::new(dmax)` 一致。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/gnom.rs`

use super::common::{BatchArgs, OutputArgs, RangeArgs};
use clap::Args;
use std::path::PathBuf;

/// gnom 子命令参数
#[derive(Args, Debug)]
pub struct GnomArgs {
    /// Input: curve file (q, I, sigma) or directory of curve files
    pub input: PathBuf,

    /// Maximum particle dimension Dmax (Å)
    #[arg(long)]
    pub dmax: f64,

    /// Minimum distance Dmin (Å)
    #[arg(long, default_value_t = 0.0)]
    pub dmin: f64,

    /// Number of P(r) points
    #[arg(short = 'n', long, default_value_t = 50)]
    pub pr_points: usize,

    /// Smallest alpha in the search grid
    #[arg(long, default_value_t = 0.01)]
    pub min_alpha: f64,

    /// Largest alpha in the search grid
    #[arg(long, default_value_t = 60.0)]
    pub max_alpha: f64,

    /// Number of alpha grid points (log spaced)
    #[arg(long, default_value_t = 100)]
    pub alpha_points: usize,

    /// Let P(r) float at r = Dmin and r = Dmax instead of pinning it to zero
    #[arg(long, default_value_t = false)]
    pub free_ends: bool,

    /// Use the chi^2-optimal alpha as the DISCRP reference instead of 0
    #[arg(long, default_value_t = false)]
    pub optimal_chi: bool,

    /// Skip the Nelder-Mead refinement after the grid search
    #[arg(long, default_value_t = false)]
    pub no_refine: bool,

    /// Refine Dmax together with alpha
    #[arg(long, default_value_t = false)]
    pub refine_dmax: bool,

    /// Solve once at this alpha instead of searching
    #[arg(long)]
    pub alpha: Option<f64>,

    #[command(flatten)]
    pub range: RangeArgs,

    #[command(flatten)]
    pub out: OutputArgs,

    #[command(flatten)]
    pub batch: BatchArgs,
}
