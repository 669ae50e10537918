//! # 取消与进度
//!
//! 搜索在每个网格点和每次精修求值前检查 `CancelToken`；取消后返回当前最优解，
//! 不视为错误。进度通过 `ProgressSink` 以事件形式发出，引擎本身从不打印。
//!
//! ## 依赖关系
//! - 被 `ift/search.rs`、`ift/refine.rs`、`ift/montecarlo.rs` 使用
//! - 被 `commands/` 用来驱动 indicatif 进度条

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 协作式取消标记，可在线程间克隆共享
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 搜索阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    GridSearch,
    LocalRefine,
    MonteCarlo,
    Done,
}

/// 进度事件
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// 进入新阶段，`total` 为该阶段预计的步数（精修阶段为上限）
    Phase { phase: SearchPhase, total: usize },
    /// 完成一个网格点
    GridPoint {
        index: usize,
        total: usize,
        dmax_index: usize,
        alpha_index: usize,
        alpha: f64,
        dmax: f64,
        /// 越大越好（evidence 或 TOTAL），非有限时为 NaN
        score: f64,
        chi_squared: f64,
        /// 当前最优点的网格序号与得分
        best_index: Option<usize>,
        best_score: f64,
    },
    /// 精修的一次求值
    RefineStep {
        evaluation: usize,
        alpha: f64,
        dmax: f64,
        score: f64,
    },
    /// Monte Carlo 完成的样本数
    MonteCarlo { completed: usize, total: usize },
}

/// 进度接收端
pub trait ProgressSink {
    fn report(&mut self, event: &ProgressEvent);
}

/// 丢弃所有事件
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _event: &ProgressEvent) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressEvent),
{
    fn report(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |e: &ProgressEvent| seen.push(e.clone());
            sink.report(&ProgressEvent::MonteCarlo {
                completed: 1,
                total: 2,
            });
        }
        assert_eq!(seen.len(), 1);
    }
}
