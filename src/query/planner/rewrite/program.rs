//! 重写程序
//!
//! 重写程序是按声明顺序执行的指令序列。每条指令或是一个阶段（单条规则、规则类别、
//! 规则组、插件规则、子程序、转换节点补齐），或是调整后续阶段的匹配顺序与匹配上限。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::planner::rewrite::rule::{rule_class_of, RewriteRule, RuleRef};

/// 匹配顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrder {
    /// 前序遍历：父节点先于子节点，左子先于右子
    TopDown,
    /// 后序遍历：子节点先于父节点，左子先于右子
    BottomUp,
}

impl Default for MatchOrder {
    fn default() -> Self {
        MatchOrder::TopDown
    }
}

/// 重写指令
#[derive(Debug, Clone)]
pub enum Instruction {
    /// 单条规则实例
    RuleInstance(RuleRef),
    /// 按描述引用的规则，执行时在注册表中查找
    RuleByName(String),
    /// 某一类别的所有已注册规则，执行时解析
    RuleClass(String),
    /// 规则组：组内规则一起应用直到局部不动点
    Group(Vec<RuleRef>),
    /// 插件注册期间收集的规则，执行时解析
    PluginRules,
    /// 子程序：重复执行直到一整轮没有任何转换
    Subprogram(RewriteProgram),
    /// 在约定不一致的父子边上补齐转换节点
    Converters,
    /// 设置后续阶段的匹配顺序
    MatchOrder(MatchOrder),
    /// 设置后续阶段的最大匹配次数
    MatchLimit(Option<usize>),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Instruction::RuleInstance(rule) => write!(f, "RuleInstance({})", rule.name()),
            Instruction::RuleByName(name) => write!(f, "RuleByName({})", name),
            Instruction::RuleClass(class) => write!(f, "RuleClass({})", class),
            Instruction::Group(rules) => write!(f, "Group(size={})", rules.len()),
            Instruction::PluginRules => write!(f, "PluginRules"),
            Instruction::Subprogram(program) => write!(f, "Subprogram(len={})", program.len()),
            Instruction::Converters => write!(f, "Converters"),
            Instruction::MatchOrder(order) => write!(f, "MatchOrder({:?})", order),
            Instruction::MatchLimit(limit) => match limit {
                Some(limit) => write!(f, "MatchLimit({})", limit),
                None => write!(f, "MatchLimit(unlimited)"),
            },
        }
    }
}

/// 重写程序
#[derive(Debug, Clone, Default)]
pub struct RewriteProgram {
    instructions: Vec<Instruction>,
}

impl RewriteProgram {
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::default()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// 重写程序构建器
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    instructions: Vec<Instruction>,
    open_group: Option<Vec<RuleRef>>,
}

impl ProgramBuilder {
    /// 添加单条规则阶段；规则组开启时加入当前组
    pub fn add_rule_instance(mut self, rule: RuleRef) -> Self {
        match self.open_group.as_mut() {
            Some(group) => group.push(rule),
            None => self.instructions.push(Instruction::RuleInstance(rule)),
        }
        self
    }

    pub fn add_rule_by_name(mut self, name: impl Into<String>) -> Self {
        self.instructions.push(Instruction::RuleByName(name.into()));
        self
    }

    /// 添加规则类别阶段
    pub fn add_rule_class<R: RewriteRule>(self) -> Self {
        self.add_rule_class_name(rule_class_of::<R>())
    }

    pub fn add_rule_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.instructions
            .push(Instruction::RuleClass(class_name.into()));
        self
    }

    /// 添加规则组阶段
    pub fn add_group(mut self, rules: Vec<RuleRef>) -> Self {
        self.instructions.push(Instruction::Group(rules));
        self
    }

    /// 开启规则组，之后添加的规则实例都进入该组
    pub fn begin_group(mut self) -> Self {
        if let Some(rules) = self.open_group.take() {
            self.instructions.push(Instruction::Group(rules));
        }
        self.open_group = Some(Vec::new());
        self
    }

    /// 结束规则组
    pub fn end_group(mut self) -> Self {
        if let Some(rules) = self.open_group.take() {
            self.instructions.push(Instruction::Group(rules));
        }
        self
    }

    pub fn add_plugin_rules(mut self) -> Self {
        self.instructions.push(Instruction::PluginRules);
        self
    }

    pub fn add_subprogram(mut self, program: RewriteProgram) -> Self {
        self.instructions.push(Instruction::Subprogram(program));
        self
    }

    pub fn add_converters(mut self) -> Self {
        self.instructions.push(Instruction::Converters);
        self
    }

    pub fn add_match_order(mut self, order: MatchOrder) -> Self {
        self.instructions.push(Instruction::MatchOrder(order));
        self
    }

    pub fn add_match_limit(mut self, limit: Option<usize>) -> Self {
        self.instructions.push(Instruction::MatchLimit(limit));
        self
    }

    /// 完成构建，未关闭的规则组自动关闭
    pub fn build(self) -> RewriteProgram {
        let builder = if self.open_group.is_some() {
            log::warn!("重写程序构建结束时规则组仍未关闭, 自动关闭");
            self.end_group()
        } else {
            self
        };
        RewriteProgram {
            instructions: builder.instructions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::planner::rewrite::merge::{CollapseProjectRule, CombineFilterRule};
    use std::sync::Arc;

    #[test]
    fn test_builder_groups() {
        let program = RewriteProgram::builder()
            .add_rule_instance(Arc::new(CombineFilterRule::new()))
            .begin_group()
            .add_rule_instance(Arc::new(CollapseProjectRule::new()))
            .add_rule_instance(Arc::new(CombineFilterRule::new()))
            .end_group()
            .add_rule_class::<CollapseProjectRule>()
            .add_match_order(MatchOrder::BottomUp)
            .build();

        assert_eq!(program.len(), 4);
        assert!(matches!(program.instructions()[0], Instruction::RuleInstance(_)));
        match &program.instructions()[1] {
            Instruction::Group(rules) => assert_eq!(rules.len(), 2),
            other => panic!("期望规则组, 实际: {}", other),
        }
        match &program.instructions()[2] {
            Instruction::RuleClass(class) => assert!(class.ends_with("CollapseProjectRule")),
            other => panic!("期望规则类别, 实际: {}", other),
        }
    }

    #[test]
    fn test_unclosed_group_is_closed_on_build() {
        let program = RewriteProgram::builder()
            .begin_group()
            .add_rule_instance(Arc::new(CollapseProjectRule::new()))
            .build();
        assert_eq!(program.len(), 1);
        assert!(matches!(program.instructions()[0], Instruction::Group(_)));
    }
}
