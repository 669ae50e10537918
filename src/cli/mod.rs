//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `bift`: 贝叶斯 IFT（网格搜索 + 精修 + Monte Carlo 误差）
//! - `gnom`: GNOM 风格正则化 IFT（固定 Dmax，按判据选 α）
//! - `simulate`: 生成合成球体散射曲线
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: common, bift, gnom, simulate

pub mod bift;
pub mod common;
pub mod gnom;
pub mod simulate;

use clap::{Parser, Subcommand};

/// saxsift - 小角散射间接 Fourier 变换
#[derive(Parser)]
#[command(name = "saxsift")]
#[command(version)]
#[command(
    about = "Indirect Fourier transform of small-angle scattering curves (BIFT and GNOM-style)",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Bayesian IFT: search alpha and Dmax by evidence, with Monte Carlo errors
    Bift(bift::BiftArgs),

    /// GNOM-style IFT at a fixed Dmax, alpha chosen by perceptual criteria
    Gnom(gnom::GnomArgs),

    /// Write a synthetic sphere scattering curve
    Simulate(simulate::SimulateArgs),
}
