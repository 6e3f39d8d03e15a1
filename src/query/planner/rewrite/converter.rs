//! 调用约定转换
//!
//! 转换规则描述从一种调用约定到另一种的显式转换。
//! `ConversionTable` 汇总已注册的转换规则，负责在约定不一致的父子边上插入转换节点：
//! - 存在直接转换规则时只插入一个转换节点
//! - 仅在没有直接规则时才按最短路径插入转换链
//! - 不在转换节点的输出上再叠加转换节点

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

use crate::query::planner::plan::{CallingConvention, Operator, PlanNode};
use crate::query::planner::rewrite::context::RewriteContext;
use crate::query::planner::rewrite::pattern::Pattern;
use crate::query::planner::rewrite::result::{RewriteError, RewriteResult, TransformResult};
use crate::query::planner::rewrite::rule::{RewriteRule, RuleRef};

/// 转换方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Conversion {
    pub from: CallingConvention,
    pub to: CallingConvention,
}

impl Conversion {
    pub fn new(from: CallingConvention, to: CallingConvention) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// 调用约定转换规则
///
/// # 转换示例
///
/// Before:
/// ```text
///   Project [NATIVE]
///       |
///   Scan [ITERATOR]
/// ```
///
/// After:
/// ```text
///   Project [NATIVE]
///       |
///   Converter(ITERATOR->NATIVE)
///       |
///   Scan [ITERATOR]
/// ```
///
/// # 适用条件
///
/// - 节点调用约定等于规则的源约定
/// - 节点本身不是转换节点
/// - 启发式重写器只在父节点要求目标约定的位置触发该规则
#[derive(Debug)]
pub struct ConverterRule {
    conversion: Conversion,
    description: String,
}

impl ConverterRule {
    pub fn new(from: CallingConvention, to: CallingConvention) -> Self {
        Self {
            conversion: Conversion::new(from, to),
            description: format!("ConverterRule({}->{})", from, to),
        }
    }

    pub fn conversion(&self) -> Conversion {
        self.conversion
    }
}

impl RewriteRule for ConverterRule {
    fn name(&self) -> &str {
        &self.description
    }

    fn pattern(&self) -> Pattern {
        Pattern::any().with_convention(self.conversion.from)
    }

    fn apply(
        &self,
        _ctx: &mut RewriteContext,
        node: &PlanNode,
    ) -> RewriteResult<Option<TransformResult>> {
        if node.convention() != self.conversion.from || node.is_converter() {
            return Ok(None);
        }
        Ok(Some(TransformResult::replace(PlanNode::converter(
            self.conversion.to,
            node.clone(),
        ))))
    }

    fn as_converter(&self) -> Option<Conversion> {
        Some(self.conversion)
    }
}

/// 转换表
#[derive(Debug, Clone, Default)]
pub struct ConversionTable {
    edges: BTreeMap<CallingConvention, BTreeSet<CallingConvention>>,
}

impl ConversionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由转换规则构建
    pub fn from_rules<'a, I: IntoIterator<Item = &'a RuleRef>>(rules: I) -> Self {
        let mut table = Self::new();
        for rule in rules {
            if let Some(conversion) = rule.as_converter() {
                table.add(conversion);
            }
        }
        table
    }

    pub fn add(&mut self, conversion: Conversion) {
        if conversion.from != conversion.to {
            self.edges
                .entry(conversion.from)
                .or_default()
                .insert(conversion.to);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// 是否存在直接转换
    pub fn has_direct(&self, from: CallingConvention, to: CallingConvention) -> bool {
        self.edges
            .get(&from)
            .map(|targets| targets.contains(&to))
            .unwrap_or(false)
    }

    /// 从 `from` 到 `to` 的转换步骤（不含起点）
    ///
    /// 存在直接转换时只返回 `[to]`；否则返回最短转换链；不可达返回 `None`。
    pub fn path(&self, from: CallingConvention, to: CallingConvention) -> Option<Vec<CallingConvention>> {
        if from == to {
            return Some(Vec::new());
        }
        if self.has_direct(from, to) {
            return Some(vec![to]);
        }

        let mut previous: HashMap<CallingConvention, CallingConvention> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            let targets = match self.edges.get(&current) {
                Some(targets) => targets,
                None => continue,
            };
            for &next in targets {
                if next == from || previous.contains_key(&next) {
                    continue;
                }
                previous.insert(next, current);
                if next == to {
                    let mut steps = vec![to];
                    let mut cursor = to;
                    while let Some(&prev) = previous.get(&cursor) {
                        if prev == from {
                            break;
                        }
                        steps.push(prev);
                        cursor = prev;
                    }
                    steps.reverse();
                    return Some(steps);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// 用转换节点包装 `node`，使其输出约定为 `to`
    pub fn convert(&self, node: PlanNode, to: CallingConvention) -> RewriteResult<PlanNode> {
        let from = node.convention();
        let steps = self
            .path(from, to)
            .ok_or_else(|| RewriteError::no_conversion(from, to))?;
        if steps.len() > 1 {
            log::debug!("{} 到 {} 没有直接转换, 插入 {} 级转换链", from, to, steps.len());
        }
        Ok(steps
            .into_iter()
            .fold(node, |acc, step| PlanNode::converter(step, acc)))
    }

    /// 在所有约定不一致的父子边上插入转换节点，返回插入的节点数
    pub fn insert_converters(&self, plan: &mut PlanNode) -> RewriteResult<usize> {
        let mut inserted = 0;
        let parent_convention = plan.convention();
        let parent_is_converter = plan.is_converter();
        for input in plan.inputs_mut().iter_mut() {
            inserted += self.insert_converters(input)?;
            if parent_is_converter || input.convention() == parent_convention {
                continue;
            }
            let before = input.node_count();
            let converted = self.convert(input.clone(), parent_convention)?;
            inserted += converted.node_count() - before;
            *input = converted;
        }
        Ok(inserted)
    }

    /// 折叠冗余转换链，返回移除的转换节点数
    ///
    /// - `B->A` 叠在 `A->B` 之上时两者都移除
    /// - `B->C` 叠在 `A->B` 之上且存在 `A->C` 直接转换时合并为一个节点
    pub fn collapse_chains(&self, plan: &mut PlanNode) -> usize {
        let mut removed = 0;
        for input in plan.inputs_mut().iter_mut() {
            removed += self.collapse_chains(input);
        }

        while let Some((inner_from, outer_to)) = converter_pair(plan) {
            let grandchild = match plan.get_at(&[0, 0]) {
                Some(node) => node.clone(),
                None => break,
            };
            if inner_from == outer_to {
                *plan = grandchild;
                removed += 2;
            } else if self.has_direct(inner_from, outer_to) {
                *plan = PlanNode::converter(outer_to, grandchild);
                removed += 1;
            } else {
                break;
            }
        }
        removed
    }
}

/// 转换节点直接叠在转换节点上时，返回（内层源约定，外层目标约定）
fn converter_pair(plan: &PlanNode) -> Option<(CallingConvention, CallingConvention)> {
    match (plan.operator(), plan.input(0)) {
        (Operator::Converter { to, .. }, Some(inner)) => match inner.operator() {
            Operator::Converter { from, .. } => Some((*from, *to)),
            _ => None,
        },
        _ => None,
    }
}
