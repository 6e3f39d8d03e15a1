//! 重写上下文定义
//!
//! 管理一次规则调用期间的状态。规则可以通过上下文登记新规则，
//! 这些规则在调用返回后才写入注册表，不会加入当前正在执行的阶段。

use crate::query::planner::rewrite::rule::RuleRef;

/// 重写上下文
#[derive(Debug, Default)]
pub struct RewriteContext {
    /// 当前阶段名称，仅用于日志
    phase: Option<String>,
    /// 规则调用期间登记的新规则
    pending_rules: Vec<RuleRef>,
}

impl RewriteContext {
    /// 创建新的重写上下文
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_phase(phase: impl Into<String>) -> Self {
        Self {
            phase: Some(phase.into()),
            pending_rules: Vec::new(),
        }
    }

    pub fn phase(&self) -> Option<&str> {
        self.phase.as_deref()
    }

    pub fn set_phase(&mut self, phase: impl Into<String>) {
        self.phase = Some(phase.into());
    }

    /// 登记一条新规则
    pub fn register_rule(&mut self, rule: RuleRef) {
        self.pending_rules.push(rule);
    }

    pub fn has_pending_rules(&self) -> bool {
        !self.pending_rules.is_empty()
    }

    /// 取出所有已登记的规则
    pub fn take_pending_rules(&mut self) -> Vec<RuleRef> {
        std::mem::take(&mut self.pending_rules)
    }
}
