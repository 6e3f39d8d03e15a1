//! 规则注册表
//!
//! 保存可用的重写规则和排除过滤器。
//! 规则按注册顺序保存，并按实例身份去重。
//! 插件注册模式开启期间注册的规则会同时记录到插件规则集合中，供重写程序后续引用。

use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;

use crate::query::planner::rewrite::rule::{same_rule, RewriteRule, RuleRef};

/// 跨规划调用共享的注册表
///
/// 规划期间只持有读锁；写锁仅在插件注册阶段使用，由调用方负责与规划串行化。
pub type SharedRuleRegistry = Arc<RwLock<RuleRegistry>>;

/// 规则注册表
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<RuleRef>,
    exclusion_filter: Option<Regex>,
    /// 当前正在注册的插件名称，`Some` 表示插件注册模式开启
    plugin_registration: Option<String>,
    plugin_rules: Vec<RuleRef>,
}

impl RuleRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册规则
    ///
    /// 同一实例重复注册不产生额外效果，返回 `false`。
    /// 插件注册模式开启时同时记录到插件规则集合。
    pub fn register(&mut self, rule: RuleRef) -> bool {
        if let Some(plugin) = &self.plugin_registration {
            if !contains_rule(&self.plugin_rules, &rule) {
                log::debug!("插件 {} 注册规则 {}", plugin, rule.name());
                self.plugin_rules.push(Arc::clone(&rule));
            }
        }

        if contains_rule(&self.rules, &rule) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    /// 注册具体规则类型的新实例
    pub fn add<R: RewriteRule + 'static>(&mut self, rule: R) -> RuleRef {
        let rule: RuleRef = Arc::new(rule);
        self.register(Arc::clone(&rule));
        rule
    }

    /// 批量注册
    pub fn register_all<I: IntoIterator<Item = RuleRef>>(&mut self, rules: I) {
        for rule in rules {
            self.register(rule);
        }
    }

    /// 注销规则，返回规则是否存在
    pub fn unregister(&mut self, rule: &RuleRef) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| !same_rule(r, rule));
        self.plugin_rules.retain(|r| !same_rule(r, rule));
        self.rules.len() != before
    }

    pub fn contains(&self, rule: &RuleRef) -> bool {
        contains_rule(&self.rules, rule)
    }

    /// 按注册顺序迭代所有规则（包括被排除的规则）
    pub fn iter(&self) -> impl Iterator<Item = &RuleRef> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn clear(&mut self) {
        self.rules.clear();
        self.plugin_rules.clear();
    }

    /// 按描述查找规则
    pub fn find_by_name(&self, name: &str) -> Option<RuleRef> {
        self.rules.iter().find(|r| r.name() == name).cloned()
    }

    /// 返回指定类别的所有规则
    pub fn rules_of_class(&self, class_name: &str) -> Vec<RuleRef> {
        self.rules
            .iter()
            .filter(|r| r.class_name() == class_name)
            .cloned()
            .collect()
    }

    /// 返回所有调用约定转换规则
    pub fn converters(&self) -> Vec<RuleRef> {
        self.rules
            .iter()
            .filter(|r| r.as_converter().is_some())
            .cloned()
            .collect()
    }

    /// 返回未被排除的规则
    pub fn active_rules(&self) -> Vec<RuleRef> {
        self.rules
            .iter()
            .filter(|r| !self.is_excluded(r.as_ref()))
            .cloned()
            .collect()
    }

    /// 设置排除过滤器
    ///
    /// 描述与正则匹配的规则在匹配阶段被跳过，但仍保留在注册表中。
    pub fn set_exclusion_filter(&mut self, filter: Option<Regex>) {
        self.exclusion_filter = filter;
    }

    pub fn exclusion_filter(&self) -> Option<&Regex> {
        self.exclusion_filter.as_ref()
    }

    pub fn is_excluded(&self, rule: &dyn RewriteRule) -> bool {
        self.exclusion_filter
            .as_ref()
            .map(|filter| filter.is_match(rule.name()))
            .unwrap_or(false)
    }

    /// 开启插件注册模式
    pub fn begin_plugin_registration(&mut self, plugin_name: impl Into<String>) {
        let plugin_name = plugin_name.into();
        if let Some(previous) = &self.plugin_registration {
            log::warn!("插件 {} 的注册尚未结束，切换到插件 {}", previous, plugin_name);
        }
        log::debug!("开始插件注册: {}", plugin_name);
        self.plugin_registration = Some(plugin_name);
    }

    /// 结束插件注册模式
    pub fn end_plugin_registration(&mut self) {
        if let Some(plugin_name) = self.plugin_registration.take() {
            log::debug!("结束插件注册: {}", plugin_name);
        }
    }

    pub fn is_plugin_registration_active(&self) -> bool {
        self.plugin_registration.is_some()
    }

    /// 插件注册期间记录的规则
    pub fn plugin_rules(&self) -> &[RuleRef] {
        &self.plugin_rules
    }

    /// 转换为共享注册表
    pub fn into_shared(self) -> SharedRuleRegistry {
        Arc::new(RwLock::new(self))
    }
}

fn contains_rule(rules: &[RuleRef], rule: &RuleRef) -> bool {
    rules.iter().any(|r| same_rule(r, rule))
}
