// ==========================================
// 非营利运营平台 - 进度回调
// ==========================================
// 回调参数: (current, total, successful, failed)
// 规则:
// - 平铺导入按行: total = 数据行数，写入前已失败的行也各推进一次
// - 分组导入按单据: total = 单据数，failed 只计单据失败（行级失败不计）
// - 结束时 successful + failed == current == total，且恰好回调一次
// ==========================================

use crate::domain::ImportResult;
use tracing::{debug, info};

/// 进度接收方（同步回调，在写入阶段调用）
pub trait ProgressSink: Send {
    fn report(&mut self, current: usize, total: usize, successful: usize, failed: usize);
}

impl<F> ProgressSink for F
where
    F: FnMut(usize, usize, usize, usize) + Send,
{
    fn report(&mut self, current: usize, total: usize, successful: usize, failed: usize) {
        self(current, total, successful, failed)
    }
}

/// 丢弃所有进度
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&mut self, _current: usize, _total: usize, _successful: usize, _failed: usize) {}
}

/// 写入 tracing 日志（CLI 默认）
#[derive(Debug, Clone)]
pub struct LogProgress {
    label: String,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl ProgressSink for LogProgress {
    fn report(&mut self, current: usize, total: usize, successful: usize, failed: usize) {
        if current == total {
            info!(source = %self.label, current, total, successful, failed, "导入进度: 完成");
        } else {
            debug!(source = %self.label, current, total, successful, failed, "导入进度");
        }
    }
}

// ==========================================
// ProgressTracker - 单次导入内的进度计数
// ==========================================
pub struct ProgressTracker<'a> {
    sink: &'a mut dyn ProgressSink,
    current: usize,
    total: usize,
    // 不计入进度的失败数（分组导入中写入前的行级失败）
    excluded_failures: usize,
    finished: bool,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink, total: usize) -> Self {
        Self {
            sink,
            current: 0,
            total,
            excluded_failures: 0,
            finished: false,
        }
    }

    /// 已记入 result 的 `count` 个失败不出现在回调的 failed 中
    pub fn excluding_failures(mut self, count: usize) -> Self {
        self.excluded_failures = count;
        self
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn failed(&self, result: &ImportResult) -> usize {
        result.failure_count.saturating_sub(self.excluded_failures)
    }

    fn step(&mut self, successful: usize, failed: usize) {
        if self.finished {
            return;
        }
        self.current = (self.current + 1).min(self.total);
        self.finished = self.current == self.total;
        self.sink.report(self.current, self.total, successful, failed);
    }

    /// 一个写入单元处理完毕
    pub fn advance(&mut self, result: &ImportResult) {
        let failed = self.failed(result);
        self.step(result.success_count, failed);
    }

    /// 写入前已失败的 `count` 行（已记入 result）逐行推进
    pub fn settle_failed_rows(&mut self, count: usize, result: &ImportResult) {
        let base = self.failed(result).saturating_sub(count);
        for i in 1..=count {
            self.step(result.success_count, base + i);
        }
    }

    /// 导入结束；若尚未回调 current == total，则补一次
    pub fn finish(mut self, result: &ImportResult) {
        if !self.finished {
            self.current = self.total;
            self.finished = true;
            let failed = self.failed(result);
            self.sink
                .report(self.current, self.total, result.success_count, failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RowError;

    #[test]
    fn test_final_report_exactly_once() {
        let mut calls = Vec::new();
        let mut sink = |c: usize, t: usize, s: usize, f: usize| calls.push((c, t, s, f));
        let mut result = ImportResult::new();

        let mut tracker = ProgressTracker::new(&mut sink, 2);
        result.record_success(1);
        tracker.advance(&result);
        result.record_success(1);
        tracker.advance(&result);
        tracker.finish(&result);

        assert_eq!(calls, vec![(1, 2, 1, 0), (2, 2, 2, 0)]);
    }

    #[test]
    fn test_empty_run_reports_zero_of_zero() {
        let mut calls = Vec::new();
        let mut sink = |c: usize, t: usize, s: usize, f: usize| calls.push((c, t, s, f));

        ProgressTracker::new(&mut sink, 0).finish(&ImportResult::new());
        assert_eq!(calls, vec![(0, 0, 0, 0)]);
    }

    #[test]
    fn test_failed_rows_advance_before_writes() {
        let mut calls = Vec::new();
        let mut sink = |c: usize, t: usize, s: usize, f: usize| calls.push((c, t, s, f));
        let mut result = ImportResult::new();
        result.record_failure(RowError::at_row(2, "bad"));
        result.record_failure(RowError::at_row(4, "bad"));

        let mut tracker = ProgressTracker::new(&mut sink, 3);
        tracker.settle_failed_rows(2, &result);
        result.record_success(1);
        tracker.advance(&result);
        tracker.finish(&result);

        assert_eq!(calls, vec![(1, 3, 0, 1), (2, 3, 0, 2), (3, 3, 1, 2)]);
    }

    #[test]
    fn test_excluded_failures_not_reported() {
        let mut calls = Vec::new();
        let mut sink = |c: usize, t: usize, s: usize, f: usize| calls.push((c, t, s, f));
        let mut result = ImportResult::new();
        result.record_failure(RowError::at_row(3, "unresolved"));

        let mut tracker = ProgressTracker::new(&mut sink, 1).excluding_failures(1);
        result.record_success(1);
        tracker.advance(&result);
        tracker.finish(&result);

        assert_eq!(calls, vec![(1, 1, 1, 0)]);
    }
}
