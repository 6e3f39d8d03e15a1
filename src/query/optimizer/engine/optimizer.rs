//! 代价优化器引擎核心实现
//! 提供 CostBasedPlanner 结构体及其优化逻辑实现
//!
//! 优化分四步：
//! 1. 探索：在备忘录上反复触发所有已注册的非转换规则，直到不再产生新表达式
//! 2. 转换：为每个被需要的（组, 调用约定）子集补齐转换表达式
//! 3. 计价：迭代松弛计算每个子集的最低代价
//! 4. 提取：从根子集开始按最低代价选择表达式，构造计划树

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::config::OptimizerConfig;
use crate::core::error::{OptimizerError, OptimizerResult};
use crate::query::optimizer::core::{Cost, CostModel};
use crate::query::optimizer::engine::exploration::{
    bindings, ExplorationState, MAX_BINDINGS_PER_NODE,
};
use crate::query::optimizer::plan::{Memo, OptimizationPhase, SubsetRef};
use crate::query::planner::plan::{CallingConvention, Operator, PlanNode};
use crate::query::planner::rewrite::{
    same_rule, ConversionTable, RewriteContext, RuleRef, SharedRuleRegistry,
};

/// 代价优化统计信息
#[derive(Debug, Clone, Default)]
pub struct OptimizerStats {
    /// 探索轮数
    pub rounds: usize,
    /// 每条规则产生新表达式的次数
    pub rule_fires: BTreeMap<String, usize>,
    /// 补齐的转换表达式数
    pub converters_added: usize,
    pub memo_expressions: usize,
    pub memo_groups: usize,
    /// 选出计划的总代价
    pub best_cost: Option<Cost>,
}

impl OptimizerStats {
    pub fn fires_of_rule(&self, rule_name: &str) -> usize {
        self.rule_fires.get(rule_name).copied().unwrap_or(0)
    }
}

/// 每个子集的最低代价及对应表达式
type BestMap = HashMap<SubsetRef, (Cost, usize)>;

/// 基于代价的规划器
#[derive(Debug)]
pub struct CostBasedPlanner {
    registry: SharedRuleRegistry,
    cost_model: Arc<dyn CostModel>,
    config: OptimizerConfig,
    memo: Memo,
    root: Option<usize>,
    stats: OptimizerStats,
}

impl CostBasedPlanner {
    pub fn new(registry: SharedRuleRegistry, cost_model: Arc<dyn CostModel>) -> Self {
        Self::with_config(registry, cost_model, OptimizerConfig::default())
    }

    pub fn with_config(
        registry: SharedRuleRegistry,
        cost_model: Arc<dyn CostModel>,
        config: OptimizerConfig,
    ) -> Self {
        Self {
            registry,
            cost_model,
            config,
            memo: Memo::new(),
            root: None,
            stats: OptimizerStats::default(),
        }
    }

    pub fn registry(&self) -> &SharedRuleRegistry {
        &self.registry
    }

    pub fn memo(&self) -> &Memo {
        &self.memo
    }

    pub fn stats(&self) -> &OptimizerStats {
        &self.stats
    }

    /// 注册规则，探索过程中新注册的规则从下一轮开始生效
    pub fn add_rule(&self, rule: RuleRef) -> bool {
        self.registry.write().register(rule)
    }

    /// 设置待优化的根计划，返回根所在的组
    pub fn set_root(&mut self, plan: &PlanNode) -> OptimizerResult<usize> {
        let group = self.memo.insert(plan)?;
        self.root = Some(group);
        log::debug!(
            "设置根计划, 组 #{}, 备忘录表达式数 {}",
            group,
            self.memo.node_count()
        );
        Ok(group)
    }

    pub fn root_group(&self) -> Option<usize> {
        self.root.map(|g| self.memo.find(g))
    }

    /// 在要求的调用约定下寻找代价最低的计划
    pub fn find_best_plan(&mut self, required: CallingConvention) -> OptimizerResult<PlanNode> {
        if !required.is_implementable() {
            return Err(OptimizerError::no_viable_plan(format!(
                "调用约定 {} 不可实现",
                required
            )));
        }
        let root = self.root.ok_or(OptimizerError::MissingRoot)?;
        self.stats = OptimizerStats::default();

        let (rules, table) = {
            let registry = self.registry.read();
            let active = registry.active_rules();
            let table = ConversionTable::from_rules(active.iter());
            let rules: Vec<RuleRef> = active
                .into_iter()
                .filter(|r| r.as_converter().is_none())
                .collect();
            (rules, table)
        };

        log::debug!("{}: {} 条规则", OptimizationPhase::Exploration, rules.len());
        self.explore(rules)?;

        log::debug!("{}: 要求约定 {}", OptimizationPhase::Conversion, required);
        self.stats.converters_added = self.add_converters(&table, root, required);

        log::debug!("{}", OptimizationPhase::Costing);
        let best = self.compute_costs();

        let target = SubsetRef::new(self.memo.find(root), required);
        log::debug!("{}: 根子集 {}", OptimizationPhase::Extraction, target);
        let plan = self.extract(target, &best, 0)?;

        self.stats.best_cost = best.get(&target).map(|(cost, _)| *cost);
        self.stats.memo_expressions = self.memo.node_count();
        self.stats.memo_groups = self.memo.group_count();
        log::debug!(
            "代价优化完成, 代价 {}, 备忘录 {} 个表达式 / {} 个组",
            self.stats.best_cost.unwrap_or_else(Cost::infinite),
            self.stats.memo_expressions,
            self.stats.memo_groups
        );
        Ok(plan)
    }

    /// 探索直到不动点或达到上限
    fn explore(&mut self, mut rules: Vec<RuleRef>) -> OptimizerResult<()> {
        let mut state = ExplorationState::default();
        let mut ctx = RewriteContext::with_phase(OptimizationPhase::Exploration.to_string());

        loop {
            if state.current_round >= self.config.max_exploration_rounds {
                log::warn!(
                    "探索达到最大轮数 {}, 提前结束",
                    self.config.max_exploration_rounds
                );
                break;
            }
            state.next_round();
            let version = self.memo.version();
            let node_count = self.memo.node_count();

            for node_id in 0..node_count {
                let mut rule_index = 0;
                while rule_index < rules.len() {
                    let rule = rules[rule_index].clone();
                    rule_index += 1;

                    let pattern = rule.pattern();
                    for binding in bindings(&self.memo, node_id, &pattern, MAX_BINDINGS_PER_NODE) {
                        if !state.mark_fired(rule.name(), &binding) {
                            continue;
                        }
                        let result = rule.apply(&mut ctx, &binding)?;
                        self.register_pending(&mut ctx, &mut rules);

                        let result = match result {
                            Some(result) => result,
                            None => continue,
                        };
                        let target = match self.memo.group_of(node_id) {
                            Some(group) => group,
                            None => continue,
                        };
                        for new_node in &result.new_nodes {
                            if *new_node == binding {
                                continue;
                            }
                            let before = self.memo.version();
                            let target = self.memo.find(target);
                            self.memo.insert_into(new_node, Some(target))?;
                            if self.memo.version() != before {
                                *self
                                    .stats
                                    .rule_fires
                                    .entry(rule.name().to_string())
                                    .or_insert(0) += 1;
                            }
                        }

                        if self.memo.node_count() >= self.config.max_memo_expressions {
                            log::warn!(
                                "备忘录表达式数达到上限 {}, 停止探索",
                                self.config.max_memo_expressions
                            );
                            self.stats.rounds = state.current_round;
                            return Ok(());
                        }
                    }
                }
            }

            if self.memo.version() == version {
                break;
            }
        }

        self.stats.rounds = state.current_round;
        log::debug!(
            "探索结束, {} 轮, 触发 {} 个绑定",
            state.current_round,
            state.fired_count()
        );
        Ok(())
    }

    /// 规则执行期间注册的新规则加入注册表和本次探索
    fn register_pending(&self, ctx: &mut RewriteContext, rules: &mut Vec<RuleRef>) {
        if !ctx.has_pending_rules() {
            return;
        }
        let mut registry = self.registry.write();
        for rule in ctx.take_pending_rules() {
            registry.register(rule.clone());
            if rule.as_converter().is_some() || registry.is_excluded(rule.as_ref()) {
                continue;
            }
            if !rules.iter().any(|r| same_rule(r, &rule)) {
                log::debug!("探索中注册新规则 {}", rule.name());
                rules.push(rule);
            }
        }
    }

    /// 为被需要的子集补齐转换表达式，返回新增的表达式数
    ///
    /// 转换的源总是组内的非转换表达式。存在直接转换时只使用直接转换；
    /// 子集既没有成员也没有任何直接转换时才使用最短转换链。
    fn add_converters(
        &mut self,
        table: &ConversionTable,
        root: usize,
        required: CallingConvention,
    ) -> usize {
        let mut added = 0;
        loop {
            let mut demands: BTreeSet<SubsetRef> = BTreeSet::new();
            demands.insert(SubsetRef::new(self.memo.find(root), required));
            for node in self.memo.nodes() {
                if !node.convention.is_implementable() {
                    continue;
                }
                for input in &node.inputs {
                    if input.convention.is_implementable() {
                        demands.insert(self.memo.canonical(*input));
                    }
                }
            }

            let before = self.memo.node_count();
            for demand in demands {
                let available: BTreeSet<CallingConvention> = self
                    .memo
                    .members(demand.group)
                    .iter()
                    .filter_map(|&id| self.memo.node(id))
                    .filter(|n| !n.is_converter() && n.convention.is_implementable())
                    .map(|n| n.convention)
                    .filter(|&c| c != demand.convention)
                    .collect();

                let direct: Vec<CallingConvention> = available
                    .iter()
                    .copied()
                    .filter(|&from| table.has_direct(from, demand.convention))
                    .collect();
                if !direct.is_empty() {
                    for from in direct {
                        self.add_conversion_steps(demand, from, &[demand.convention]);
                    }
                    continue;
                }

                if !self
                    .memo
                    .members_with_convention(demand.group, demand.convention)
                    .is_empty()
                {
                    continue;
                }
                let chain = available
                    .iter()
                    .filter_map(|&from| table.path(from, demand.convention).map(|p| (from, p)))
                    .min_by_key(|(_, steps)| steps.len());
                match chain {
                    Some((from, steps)) => {
                        log::debug!(
                            "子集 {} 没有直接转换, 使用 {} 级转换链",
                            demand,
                            steps.len()
                        );
                        self.add_conversion_steps(demand, from, &steps);
                    }
                    None => log::debug!("子集 {} 无法通过转换获得", demand),
                }
            }

            let round_added = self.memo.node_count() - before;
            if round_added == 0 {
                break;
            }
            added += round_added;
        }
        added
    }

    fn add_conversion_steps(
        &mut self,
        demand: SubsetRef,
        from: CallingConvention,
        steps: &[CallingConvention],
    ) {
        let mut previous = from;
        for &step in steps {
            let group = self.memo.find(demand.group);
            self.memo.add_expression(
                Operator::Converter {
                    from: previous,
                    to: step,
                },
                step,
                vec![SubsetRef::new(group, previous)],
                Some(group),
            );
            previous = step;
        }
    }

    /// 迭代松弛计算每个子集的最低代价
    fn compute_costs(&self) -> BestMap {
        let mut best: BestMap = HashMap::new();
        let max_passes = self.memo.node_count() + 1;

        for _ in 0..max_passes {
            let mut changed = false;
            for node in self.memo.nodes() {
                if !node.convention.is_implementable() {
                    continue;
                }
                let own = self.cost_model.cost(&node.shallow_plan());
                if own.is_infinite() {
                    continue;
                }

                let mut total = own;
                let mut viable = true;
                for input in &node.inputs {
                    match best.get(&self.memo.canonical(*input)) {
                        Some((cost, _)) => total = total + *cost,
                        None => {
                            viable = false;
                            break;
                        }
                    }
                }
                if !viable || total.is_infinite() {
                    continue;
                }

                let key = SubsetRef::new(self.memo.find(node.group), node.convention);
                let improved = best
                    .get(&key)
                    .map(|(current, _)| total.is_lt(current))
                    .unwrap_or(true);
                if improved {
                    best.insert(key, (total, node.id));
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        best
    }

    fn extract(&self, subset: SubsetRef, best: &BestMap, depth: usize) -> OptimizerResult<PlanNode> {
        if depth > self.memo.node_count() {
            return Err(OptimizerError::no_viable_plan("选出的表达式之间存在环"));
        }
        let subset = self.memo.canonical(subset);
        let (_, node_id) = best.get(&subset).ok_or_else(|| {
            OptimizerError::no_viable_plan(format!(
                "组 #{} 在约定 {} 下没有有限代价的实现",
                subset.group, subset.convention
            ))
        })?;
        let node = self
            .memo
            .node(*node_id)
            .ok_or(OptimizerError::GroupNotFound(subset.group))?;

        let inputs = node
            .inputs
            .iter()
            .map(|input| self.extract(*input, best, depth + 1))
            .collect::<OptimizerResult<Vec<_>>>()?;
        Ok(PlanNode::new(node.operator.clone(), inputs, node.convention))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::optimizer::core::DefaultCostModel;
    use crate::query::planner::plan::Expr;
    use crate::query::planner::rewrite::{
        CombineFilterRule, ConverterRule, ImplementRule, RuleRegistry,
    };

    fn planner(rules: Vec<RuleRef>) -> CostBasedPlanner {
        let mut registry = RuleRegistry::new();
        registry.register_all(rules);
        CostBasedPlanner::new(registry.into_shared(), Arc::new(DefaultCostModel::new()))
    }

    fn all_conventions(plan: &PlanNode) -> Vec<CallingConvention> {
        let mut out = vec![plan.convention()];
        for input in plan.inputs() {
            out.extend(all_conventions(input));
        }
        out
    }

    #[test]
    fn test_converter_bridges_conventions() {
        let mut planner = planner(vec![
            Arc::new(ImplementRule::new(CallingConvention::Iterator, vec!["Scan"])),
            Arc::new(ImplementRule::new(CallingConvention::Native, vec!["Filter"])),
            Arc::new(ConverterRule::new(
                CallingConvention::Iterator,
                CallingConvention::Native,
            )),
        ]);
        planner
            .set_root(&PlanNode::filter(Expr::col("a").gt(Expr::int(1)), PlanNode::scan("T")))
            .expect("设置根计划应成功");

        let best = planner
            .find_best_plan(CallingConvention::Native)
            .expect("应找到可行计划");
        assert_eq!(
            best.digest(),
            "Filter[a>1]@NATIVE(Converter[ITERATOR->NATIVE]@NATIVE(Scan[T]@ITERATOR))"
        );
        assert_eq!(planner.stats().converters_added, 1);
        assert!(best.validate_conventions().is_ok());
    }

    #[test]
    fn test_cheaper_alternative_wins() {
        let mut planner = planner(vec![
            Arc::new(ImplementRule::all_operators(CallingConvention::Iterator)),
            Arc::new(ImplementRule::new(CallingConvention::Columnar, vec!["Scan"])),
            Arc::new(ConverterRule::new(
                CallingConvention::Columnar,
                CallingConvention::Iterator,
            )),
        ]);
        planner.set_root(&PlanNode::scan("T")).expect("设置根计划应成功");

        let best = planner
            .find_best_plan(CallingConvention::Iterator)
            .expect("应找到可行计划");
        assert_eq!(
            best.digest(),
            "Converter[COLUMNAR->ITERATOR]@ITERATOR(Scan[T]@COLUMNAR)"
        );
        let cost = planner.stats().best_cost.expect("应记录最佳代价");
        assert!(cost.total() < 101.0);
    }

    #[test]
    fn test_exploration_finds_merged_filter() {
        let mut planner = planner(vec![
            Arc::new(CombineFilterRule::new()),
            Arc::new(ImplementRule::all_operators(CallingConvention::Iterator)),
        ]);
        let plan = PlanNode::filter(
            Expr::col("b").gt(Expr::int(2)),
            PlanNode::filter(Expr::col("a").gt(Expr::int(1)), PlanNode::scan("T")),
        );
        planner.set_root(&plan).expect("设置根计划应成功");

        let best = planner
            .find_best_plan(CallingConvention::Iterator)
            .expect("应找到可行计划");
        assert_eq!(best.node_count(), 2, "合并后的过滤更便宜");
        assert!(all_conventions(&best)
            .iter()
            .all(|c| *c == CallingConvention::Iterator));
        assert!(planner.stats().fires_of_rule("CombineFilterRule") >= 1);
    }

    #[test]
    fn test_no_viable_plan() {
        let mut planner = planner(Vec::new());
        assert!(matches!(
            planner.find_best_plan(CallingConvention::Iterator),
            Err(OptimizerError::MissingRoot)
        ));

        planner.set_root(&PlanNode::scan("T")).expect("设置根计划应成功");
        assert!(matches!(
            planner.find_best_plan(CallingConvention::Iterator),
            Err(OptimizerError::NoViablePlan(_))
        ));
        assert!(matches!(
            planner.find_best_plan(CallingConvention::None),
            Err(OptimizerError::NoViablePlan(_))
        ));
    }

    #[test]
    fn test_chain_only_without_direct_rule() {
        let mut planner = planner(vec![
            Arc::new(ImplementRule::new(CallingConvention::Columnar, vec!["Scan"])),
            Arc::new(ConverterRule::new(
                CallingConvention::Columnar,
                CallingConvention::Iterator,
            )),
            Arc::new(ConverterRule::new(
                CallingConvention::Iterator,
                CallingConvention::Native,
            )),
        ]);
        planner.set_root(&PlanNode::scan("T")).expect("设置根计划应成功");

        let best = planner
            .find_best_plan(CallingConvention::Native)
            .expect("应找到可行计划");
        assert_eq!(
            best.digest(),
            "Converter[ITERATOR->NATIVE]@NATIVE(Converter[COLUMNAR->ITERATOR]@ITERATOR(Scan[T]@COLUMNAR))"
        );
    }
}
