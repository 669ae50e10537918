//! # 共享参数
//!
//! `bift` 与 `gnom` 共用的输入、批量与输出参数。
//!
//! ## 依赖关系
//! - 被 `cli/bift.rs`、`cli/gnom.rs` 通过 `#[command(flatten)]` 使用

use clap::Args;
use std::path::PathBuf;

/// q 点范围选择
#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// First data point to use (0-based, inclusive)
    #[arg(long)]
    pub qmin_index: Option<usize>,

    /// Last data point to use (0-based, exclusive)
    #[arg(long)]
    pub qmax_index: Option<usize>,
}

/// 批量处理参数
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Glob pattern(s) for input files in batch mode, comma separated
    #[arg(long, default_value = "*.dat,*.txt")]
    pub pattern: String,

    /// Number of parallel jobs (0 = auto, batch mode only)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Recurse into subdirectories (batch mode)
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}

/// 输出参数
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output directory for CSV tables and plots
    #[arg(short, long, default_value = "saxsift_results")]
    pub output: PathBuf,

    /// Skip plot generation
    #[arg(long, default_value_t = false)]
    pub no_plot: bool,

    /// Write the plot as SVG instead of PNG
    #[arg(long, default_value_t = false)]
    pub svg: bool,

    /// Figure width in pixels (PNG) or points (SVG)
    #[arg(long, default_value_t = 1400)]
    pub width: u32,

    /// Figure height in pixels (PNG) or points (SVG)
    #[arg(long, default_value_t = 600)]
    pub height: u32,
}
