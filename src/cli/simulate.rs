//! # simulate 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/simulate.rs`

use clap::Args;
use std::path::PathBuf;

/// simulate 子命令参数
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Output curve file (three columns: q, I, sigma)
    #[arg(default_value = "sphere.dat")]
    pub output: PathBuf,

    /// Smallest q (1/Å)
    #[arg(long, default_value_t = 0.005)]
    pub q_min: f64,

    /// Largest q (1/Å)
    #[arg(long, default_value_t = 0.35)]
    pub q_max: f64,

    /// Number of q points
    #[arg(long, default_value_t = 250)]
    pub points: usize,

    /// Sphere diameter Dmax (Å)
    #[arg(long, default_value_t = 45.0)]
    pub dmax: f64,

    /// Forward scattering scale, roughly I(0)
    #[arg(long, default_value_t = 1000.0)]
    pub scale: f64,

    /// Gaussian noise sigma, also written as the error column
    #[arg(long, default_value_t = 0.5)]
    pub noise: f64,

    /// Random seed for the noise
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Write the exact curve without noise
    #[arg(long, default_value_t = false)]
    pub noiseless: bool,

    /// Overwrite an existing output file
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
