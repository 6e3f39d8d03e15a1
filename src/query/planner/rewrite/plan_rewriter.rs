//! 启发式计划重写器
//!
//! 按声明顺序执行重写程序的每条指令。规则组阶段反复扫描整棵计划树：
//! 找到第一个（位置, 规则）匹配并且规则产生替换节点时，原地替换子树并从头重新扫描；
//! 一整轮扫描没有任何规则触发时该阶段结束。
//!
//! 扫描顺序是确定的：先按匹配顺序（默认前序、左子优先）遍历位置，
//! 同一位置上按规则在组内的顺序依次尝试。

use std::collections::BTreeMap;

use crate::config::RewriteConfig;
use crate::query::planner::plan::PlanNode;
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::converter::ConversionTable;
use crate::query::planner::rewrite::program::{Instruction, MatchOrder, RewriteProgram};
use crate::query::planner::rewrite::registry::{RuleRegistry, SharedRuleRegistry};
use crate::query::planner::rewrite::result::{RewriteError, RewriteResult};
use crate::query::planner::rewrite::rule::RuleRef;

/// 重写统计信息
#[derive(Debug, Clone, Default)]
pub struct RewriteStats {
    /// 转换总次数（含插入的转换节点）
    pub transformations: usize,
    /// 每条规则的触发次数
    pub rule_fires: BTreeMap<String, usize>,
    /// 已执行的阶段数
    pub phases: usize,
    /// 因安全上限被提前结束的规则组数
    pub bounded_groups: usize,
}

impl RewriteStats {
    pub fn fires_of(&self, rule_name: &str) -> usize {
        self.rule_fires.get(rule_name).copied().unwrap_or(0)
    }
}

/// 单个程序执行期间的匹配状态
#[derive(Debug, Clone, Copy)]
struct MatchState {
    order: MatchOrder,
    limit: Option<usize>,
}

/// 启发式计划重写器
#[derive(Debug)]
pub struct HeuristicPlanner {
    registry: SharedRuleRegistry,
    config: RewriteConfig,
    program: RewriteProgram,
    root: Option<PlanNode>,
    stats: RewriteStats,
}

impl HeuristicPlanner {
    /// 创建新的启发式重写器
    pub fn new(registry: SharedRuleRegistry) -> Self {
        Self::with_config(registry, RewriteConfig::default())
    }

    pub fn with_config(registry: SharedRuleRegistry, config: RewriteConfig) -> Self {
        Self {
            registry,
            config,
            program: RewriteProgram::default(),
            root: None,
            stats: RewriteStats::default(),
        }
    }

    /// 设置 `find_best_plan` 执行的程序
    pub fn set_program(&mut self, program: RewriteProgram) {
        self.program = program;
    }

    pub fn program(&self) -> &RewriteProgram {
        &self.program
    }

    pub fn set_root(&mut self, root: PlanNode) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<&PlanNode> {
        self.root.as_ref()
    }

    /// 对已设置的根执行程序；结果同时成为新的根，可以继续执行其他程序
    pub fn find_best_plan(&mut self) -> RewriteResult<PlanNode> {
        let root = self
            .root
            .take()
            .ok_or_else(|| RewriteError::invalid_plan_structure("未设置计划根节点"))?;
        let program = std::mem::take(&mut self.program);
        let result = self.apply(&program, root.clone());
        self.program = program;
        match result {
            Ok(best) => {
                self.root = Some(best.clone());
                Ok(best)
            }
            Err(e) => {
                self.root = Some(root);
                Err(e)
            }
        }
    }

    pub fn registry(&self) -> &SharedRuleRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &RewriteStats {
        &self.stats
    }

    /// 注册规则，插件注册模式开启时同时记录到插件规则集合
    pub fn add_rule(&self, rule: RuleRef) -> bool {
        self.registry.write().register(rule)
    }

    pub fn begin_plugin_registration(&self, plugin_name: impl Into<String>) {
        self.registry.write().begin_plugin_registration(plugin_name);
    }

    pub fn end_plugin_registration(&self) {
        self.registry.write().end_plugin_registration();
    }

    /// 对计划树执行重写程序，返回重写后的计划树
    pub fn apply(&mut self, program: &RewriteProgram, root: PlanNode) -> RewriteResult<PlanNode> {
        self.stats = RewriteStats::default();
        let mut root = root;
        self.execute_program(program, &mut root)?;
        log::debug!(
            "启发式重写完成: {} 个阶段, {} 次转换",
            self.stats.phases,
            self.stats.transformations
        );
        Ok(root)
    }

    fn execute_program(&mut self, program: &RewriteProgram, root: &mut PlanNode) -> RewriteResult<()> {
        let mut state = MatchState {
            order: self.config.match_order,
            limit: self.config.match_limit,
        };

        for instruction in program.instructions() {
            match instruction {
                Instruction::MatchOrder(order) => state.order = *order,
                Instruction::MatchLimit(limit) => state.limit = *limit,
                Instruction::Subprogram(sub) => {
                    self.stats.phases += 1;
                    self.execute_subprogram(sub, root)?;
                }
                Instruction::Converters => {
                    self.stats.phases += 1;
                    self.execute_converters(root)?;
                }
                _ => {
                    self.stats.phases += 1;
                    let rules = self.resolve_rules(instruction);
                    if rules.is_empty() {
                        log::debug!("阶段 {} 没有可用规则, 跳过", instruction);
                        continue;
                    }
                    self.apply_group(&instruction.to_string(), &rules, root, state)?;
                }
            }
        }
        Ok(())
    }

    /// 重复执行子程序直到一整轮没有任何转换
    fn execute_subprogram(&mut self, program: &RewriteProgram, root: &mut PlanNode) -> RewriteResult<()> {
        let mut rounds = 0;
        loop {
            let before = self.stats.transformations;
            self.execute_program(program, root)?;
            if self.stats.transformations == before {
                return Ok(());
            }
            rounds += 1;
            if rounds >= self.config.max_group_iterations {
                log::warn!("子程序执行 {} 轮后仍未收敛, 提前结束", rounds);
                self.stats.bounded_groups += 1;
                return Ok(());
            }
        }
    }

    fn execute_converters(&mut self, root: &mut PlanNode) -> RewriteResult<()> {
        let table = {
            let registry = self.registry.read();
            let converters: Vec<RuleRef> = registry
                .converters()
                .into_iter()
                .filter(|r| !registry.is_excluded(r.as_ref()))
                .collect();
            ConversionTable::from_rules(&converters)
        };
        let inserted = table.insert_converters(root)?;
        let removed = table.collapse_chains(root);
        if inserted > 0 || removed > 0 {
            log::debug!("转换阶段插入 {} 个、折叠 {} 个转换节点", inserted, removed);
        }
        self.stats.transformations += inserted + removed;
        Ok(())
    }

    /// 解析阶段对应的规则列表，排除过滤器命中的规则被跳过
    fn resolve_rules(&self, instruction: &Instruction) -> Vec<RuleRef> {
        let registry = self.registry.read();
        let candidates = match instruction {
            Instruction::RuleInstance(rule) => vec![rule.clone()],
            Instruction::RuleByName(name) => registry.find_by_name(name).into_iter().collect(),
            Instruction::RuleClass(class) => registry.rules_of_class(class),
            Instruction::Group(rules) => rules.clone(),
            Instruction::PluginRules => registry.plugin_rules().to_vec(),
            _ => Vec::new(),
        };
        filter_excluded(&registry, candidates)
    }

    /// 将规则组应用到局部不动点
    fn apply_group(
        &mut self,
        phase: &str,
        rules: &[RuleRef],
        root: &mut PlanNode,
        state: MatchState,
    ) -> RewriteResult<()> {
        let mut fired = 0;
        loop {
            if let Some(limit) = state.limit {
                if fired >= limit {
                    log::debug!("阶段 {} 达到匹配上限 {}", phase, limit);
                    return Ok(());
                }
            }
            if fired >= self.config.max_group_iterations {
                log::warn!(
                    "阶段 {} 转换 {} 次后仍未到达不动点, 提前结束",
                    phase,
                    fired
                );
                self.stats.bounded_groups += 1;
                return Ok(());
            }

            match self.apply_first_match(phase, rules, root, state.order)? {
                Some(rule_name) => {
                    fired += 1;
                    self.stats.transformations += 1;
                    *self.stats.rule_fires.entry(rule_name).or_insert(0) += 1;
                }
                None => return Ok(()),
            }
        }
    }

    /// 扫描整棵树，应用第一个成功的（位置, 规则），返回触发的规则名称
    fn apply_first_match(
        &self,
        phase: &str,
        rules: &[RuleRef],
        root: &mut PlanNode,
        order: MatchOrder,
    ) -> RewriteResult<Option<String>> {
        let paths = match order {
            MatchOrder::TopDown => root.pre_order_paths(),
            MatchOrder::BottomUp => root.post_order_paths(),
        };

        for path in paths {
            for rule in rules {
                let replacement = {
                    let node = match root.get_at(&path) {
                        Some(node) => node,
                        None => continue,
                    };
                    if !rule.matches(node) || !converter_applies(rule, root, &path) {
                        continue;
                    }

                    let mut ctx = RewriteContext::with_phase(phase);
                    let result = rule.apply(&mut ctx, node);
                    self.register_pending(&mut ctx);
                    match result?.and_then(|r| r.into_first()) {
                        Some(new_node) if new_node != *node => new_node,
                        _ => continue,
                    }
                };

                log::debug!("规则 {} 在位置 {:?} 触发", rule.name(), path);
                root.replace_at(&path, replacement)?;
                return Ok(Some(rule.name().to_string()));
            }
        }
        Ok(None)
    }

    /// 将规则调用期间登记的新规则写入注册表
    fn register_pending(&self, ctx: &mut RewriteContext) {
        if !ctx.has_pending_rules() {
            return;
        }
        let mut registry = self.registry.write();
        for rule in ctx.take_pending_rules() {
            registry.register(rule);
        }
    }
}

fn filter_excluded(registry: &RuleRegistry, rules: Vec<RuleRef>) -> Vec<RuleRef> {
    rules
        .into_iter()
        .filter(|rule| {
            let excluded = registry.is_excluded(rule.as_ref());
            if excluded {
                log::debug!("规则 {} 被排除过滤器跳过", rule.name());
            }
            !excluded
        })
        .collect()
}

/// 转换规则只在父节点要求其目标约定、且父节点本身不是转换节点的位置触发
fn converter_applies(rule: &RuleRef, root: &PlanNode, path: &[usize]) -> bool {
    let conversion = match rule.as_converter() {
        Some(conversion) => conversion,
        None => return true,
    };
    let parent = match path.split_last() {
        Some((_, parent_path)) => root.get_at(parent_path),
        None => None,
    };
    match parent {
        Some(parent) => !parent.is_converter() && parent.convention() == conversion.to,
        None => false,
    }
}
