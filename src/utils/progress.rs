//! # 进度条
//!
//! 封装 `indicatif`：批量处理用计数进度条，单条曲线的搜索用
//! `SearchProgress` 把引擎的进度事件映射到同一根进度条上。
//!
//! ## 依赖关系
//! - 被 `commands/`、`batch/runner.rs` 使用
//! - 使用 `indicatif` crate，消费 `saxsift::ift::ProgressEvent`

use indicatif::{ProgressBar, ProgressStyle};
use saxsift::ift::{ProgressEvent, SearchPhase};
use std::cell::Cell;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";

/// 创建标准进度条
pub fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// 搜索进度显示
pub struct SearchProgress {
    bar: ProgressBar,
    /// 当前阶段的步数上限
    limit: Cell<u64>,
}

impl SearchProgress {
    pub fn new() -> Self {
        Self {
            bar: create_progress_bar(0, "Starting"),
            limit: Cell::new(0),
        }
    }

    /// 处理一个进度事件
    pub fn handle(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Phase { phase, total } => {
                let message = match phase {
                    SearchPhase::GridSearch => "Grid search",
                    SearchPhase::LocalRefine => "Refining",
                    SearchPhase::MonteCarlo => "Monte Carlo",
                    SearchPhase::Done => {
                        self.bar.finish_and_clear();
                        return;
                    }
                };
                self.limit.set(*total as u64);
                self.bar.set_length(*total as u64);
                self.bar.set_position(0);
                self.bar.set_message(message);
            }
            ProgressEvent::GridPoint {
                index, best_score, ..
            } => {
                self.bar.set_position(*index as u64 + 1);
                if best_score.is_finite() {
                    self.bar.set_message(format!("Grid search (best {:.4})", best_score));
                }
            }
            ProgressEvent::RefineStep {
                evaluation,
                alpha,
                dmax,
                score,
            } => {
                self.bar.set_position((*evaluation as u64).min(self.limit.get()));
                self.bar.set_message(format!(
                    "Refining (α = {:.3e}, Dmax = {:.1}, score {:.4})",
                    alpha, dmax, score
                ));
            }
            ProgressEvent::MonteCarlo { completed, .. } => {
                self.bar.set_position(*completed as u64);
            }
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
