//! 启发式重写集成测试
//!
//! 测试范围:
//! - rewrite::plan_rewriter - 指令顺序、规则组不动点、匹配顺序
//! - rewrite::registry - 插件注册、排除过滤器、按名称和类别解析
//! - rewrite::converter - 转换阶段

mod common;

use std::sync::Arc;

use common::assertions::{assert_digest, assert_err_with};
use common::data_fixtures::{filter_chain, project_chain, three_projects};
use common::{rule, shared_registry};
use graphplan::query::planner::plan::{CallingConvention, Expr, PlanNode};
use graphplan::query::planner::rewrite::{
    CollapseProjectRule, CombineFilterRule, ConverterRule, EliminateFilterRule, HeuristicPlanner,
    MatchOrder, Pattern, RewriteContext, RewriteError, RewriteProgram, RewriteResult,
    RewriteRule, RuleRegistry, TransformResult,
};
use regex::Regex;

/// 匹配 Scan 时通过上下文登记一条 CombineFilterRule，自身不做转换
#[derive(Debug)]
struct AnnouncingRule;

impl RewriteRule for AnnouncingRule {
    fn name(&self) -> &str {
        "AnnouncingRule"
    }

    fn pattern(&self) -> Pattern {
        Pattern::new_with_name("Scan")
    }

    fn apply(&self, ctx: &mut RewriteContext, _node: &PlanNode) -> RewriteResult<Option<TransformResult>> {
        ctx.register_rule(Arc::new(CombineFilterRule::new()));
        Ok(None)
    }
}

#[derive(Debug)]
struct FailingRule;

impl RewriteRule for FailingRule {
    fn name(&self) -> &str {
        "FailingRule"
    }

    fn pattern(&self) -> Pattern {
        Pattern::new_with_name("Scan")
    }

    fn apply(&self, _ctx: &mut RewriteContext, _node: &PlanNode) -> RewriteResult<Option<TransformResult>> {
        Err(RewriteError::rule_failed("FailingRule", "boom"))
    }
}

// ==================== 规则组 ====================

#[test]
fn test_collapse_adjacent_projects() {
    let registry = RuleRegistry::new().into_shared();
    let program = RewriteProgram::builder()
        .add_group(vec![rule(CollapseProjectRule::new())])
        .build();
    let mut planner = HeuristicPlanner::new(registry);

    let result = planner.apply(&program, project_chain()).expect("重写应成功");
    assert_digest(&result, "Project[a+1]@NONE(Scan[T]@NONE)");
    assert_eq!(planner.stats().transformations, 1);

    let again = planner.apply(&program, result.clone()).expect("重写应成功");
    assert_eq!(again, result, "到达不动点后再次执行不应改变计划");
    assert_eq!(planner.stats().transformations, 0, "第二次执行不应有规则触发");
}

#[test]
fn test_group_fixpoint_is_idempotent() {
    let registry = RuleRegistry::new().into_shared();
    let program = RewriteProgram::builder()
        .begin_group()
        .add_rule_instance(rule(EliminateFilterRule::new()))
        .add_rule_instance(rule(CombineFilterRule::new()))
        .end_group()
        .build();
    let mut planner = HeuristicPlanner::new(registry);

    let plan = PlanNode::filter(Expr::boolean(true), filter_chain());
    let result = planner.apply(&program, plan).expect("重写应成功");
    assert_digest(&result, "Filter[(b>2) AND (a>1)]@NONE(Scan[T]@NONE)");
    assert_eq!(planner.stats().fires_of("EliminateFilterRule"), 1);
    assert_eq!(planner.stats().fires_of("CombineFilterRule"), 1);

    let again = planner.apply(&program, result.clone()).expect("重写应成功");
    assert_eq!(again, result);
    assert_eq!(planner.stats().transformations, 0);
}

#[test]
fn test_top_down_leftmost_first() {
    let registry = RuleRegistry::new().into_shared();
    let program = RewriteProgram::builder()
        .add_match_limit(Some(1))
        .add_rule_instance(rule(EliminateFilterRule::new()))
        .build();
    let mut planner = HeuristicPlanner::new(registry);

    let plan = PlanNode::union(
        true,
        vec![
            PlanNode::filter(Expr::boolean(true), PlanNode::scan("A")),
            PlanNode::filter(Expr::boolean(true), PlanNode::scan("B")),
        ],
    );
    let result = planner.apply(&program, plan).expect("重写应成功");
    assert_eq!(result.input(0).map(|n| n.name()), Some("Scan"), "左侧过滤应先被消除");
    assert_eq!(result.input(1).map(|n| n.name()), Some("Filter"));
}

#[test]
fn test_bottom_up_reaches_same_fixpoint() {
    let registry = RuleRegistry::new().into_shared();
    let plan = three_projects();

    let top_down = RewriteProgram::builder()
        .add_rule_instance(rule(CollapseProjectRule::new()))
        .build();
    let bottom_up = RewriteProgram::builder()
        .add_match_order(MatchOrder::BottomUp)
        .add_rule_instance(rule(CollapseProjectRule::new()))
        .build();

    let mut planner = HeuristicPlanner::new(registry);
    let a = planner.apply(&top_down, plan.clone()).expect("重写应成功");
    let b = planner.apply(&bottom_up, plan).expect("重写应成功");
    assert_eq!(a.node_count(), 2);
    assert_eq!(b.node_count(), 2);
}

#[test]
fn test_subprogram_repeats_until_quiet() {
    let registry = RuleRegistry::new().into_shared();
    let inner = RewriteProgram::builder()
        .add_match_limit(Some(1))
        .add_rule_instance(rule(CollapseProjectRule::new()))
        .build();
    let program = RewriteProgram::builder().add_subprogram(inner).build();
    let mut planner = HeuristicPlanner::new(registry);

    let plan = three_projects();
    let result = planner.apply(&program, plan).expect("重写应成功");
    assert_eq!(result.node_count(), 2);
    assert_eq!(planner.stats().fires_of("CollapseProjectRule"), 2);
}

#[test]
fn test_rule_failure_propagates() {
    let registry = RuleRegistry::new().into_shared();
    let program = RewriteProgram::builder()
        .add_rule_instance(rule(FailingRule))
        .build();
    let mut planner = HeuristicPlanner::new(registry);
    assert_err_with(planner.apply(&program, PlanNode::scan("T")), "boom");
}

// ==================== 注册表 ====================

#[test]
fn test_rule_by_name_resolved_at_execution() {
    let registry = RuleRegistry::new().into_shared();
    let program = RewriteProgram::builder()
        .add_rule_by_name("CombineFilterRule")
        .build();
    let mut planner = HeuristicPlanner::new(registry);

    let unchanged = planner.apply(&program, filter_chain()).expect("空阶段不应报错");
    assert_eq!(unchanged, filter_chain());

    planner.add_rule(rule(CombineFilterRule::new()));
    let result = planner.apply(&program, filter_chain()).expect("重写应成功");
    assert_eq!(result.node_count(), 2);
}

#[test]
fn test_exclusion_filter_skips_rules() {
    let registry = shared_registry(vec![rule(CollapseProjectRule::new())]);
    registry
        .write()
        .set_exclusion_filter(Some(Regex::new("^Collapse").expect("正则应有效")));
    let program = RewriteProgram::builder()
        .add_rule_class::<CollapseProjectRule>()
        .build();
    let mut planner = HeuristicPlanner::new(registry.clone());

    let result = planner.apply(&program, project_chain()).expect("重写应成功");
    assert_eq!(result, project_chain(), "被排除的规则不应触发");
    assert_eq!(registry.read().len(), 1, "被排除的规则仍保留在注册表中");

    registry.write().set_exclusion_filter(None);
    let result = planner.apply(&program, project_chain()).expect("重写应成功");
    assert_eq!(result.node_count(), 2);
}

#[test]
fn test_plugin_registration_records_side_collection() {
    let registry = RuleRegistry::new().into_shared();
    let discover = RewriteProgram::builder()
        .add_rule_instance(rule(AnnouncingRule))
        .build();
    let apply_plugins = RewriteProgram::builder().add_plugin_rules().build();
    let mut planner = HeuristicPlanner::new(registry.clone());

    planner.begin_plugin_registration("filters");
    let plan = planner.apply(&discover, filter_chain()).expect("重写应成功");
    planner.end_plugin_registration();

    assert_eq!(plan, filter_chain(), "登记规则的调用本身不改变计划");
    assert_eq!(planner.stats().transformations, 0, "新规则不加入当前阶段");
    assert_eq!(registry.read().plugin_rules().len(), 1);

    let result = planner.apply(&apply_plugins, plan).expect("重写应成功");
    assert_eq!(result.node_count(), 2);

    planner.apply(&discover, PlanNode::scan("T")).expect("重写应成功");
    assert_eq!(registry.read().plugin_rules().len(), 1, "注册模式关闭后不再记录插件规则");
    assert_eq!(registry.read().len(), 2);
}

// ==================== 转换阶段 ====================

#[test]
fn test_converters_phase_bridges_edges() {
    let registry = shared_registry(vec![rule(ConverterRule::new(
        CallingConvention::Iterator,
        CallingConvention::Native,
    ))]);
    let program = RewriteProgram::builder().add_converters().build();
    let mut planner = HeuristicPlanner::new(registry);

    let plan = PlanNode::filter(
        Expr::col("a").gt(Expr::int(1)),
        PlanNode::scan("T").with_convention(CallingConvention::Iterator),
    )
    .with_convention(CallingConvention::Native);
    let result = planner.apply(&program, plan).expect("重写应成功");
    assert_digest(
        &result,
        "Filter[a>1]@NATIVE(Converter[ITERATOR->NATIVE]@NATIVE(Scan[T]@ITERATOR))",
    );
    assert!(result.validate_conventions().is_ok());
}

#[test]
fn test_converters_phase_without_path() {
    let registry = RuleRegistry::new().into_shared();
    let program = RewriteProgram::builder().add_converters().build();
    let mut planner = HeuristicPlanner::new(registry);

    let plan = PlanNode::filter(
        Expr::col("a").gt(Expr::int(1)),
        PlanNode::scan("T").with_convention(CallingConvention::Columnar),
    )
    .with_convention(CallingConvention::Iterator);
    let err = planner.apply(&program, plan).expect_err("没有转换规则时应报错");
    assert!(matches!(err, RewriteError::NoConversion { .. }));
}
