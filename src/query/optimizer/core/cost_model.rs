//! 代价模型配置和计算
//!
//! 代价模型只估算单个节点自身的代价，子节点以 `Subset` 占位出现，
//! 累加子树代价由优化器完成。

use super::cost::Cost;
use crate::query::planner::plan::{CallingConvention, Operator, PlanNode};

/// 代价模型
pub trait CostModel: std::fmt::Debug + Send + Sync {
    /// 估算单个节点（不含子节点）的代价
    ///
    /// 返回无穷大代价表示该节点不可实现。
    fn cost(&self, node: &PlanNode) -> Cost;
}

/// 代价模型配置
#[derive(Debug, Clone, Copy)]
pub struct CostModelConfig {
    /// 扫描一张表的 I/O 代价
    pub scan_io_cost: f64,

    /// 常量行的 CPU 代价（每行）
    pub values_row_cost: f64,

    /// 过滤、投影等逐行算子的 CPU 代价
    pub row_operator_cost: f64,

    /// 连接算子的 CPU 代价
    pub join_cost: f64,

    /// 聚合算子的 CPU 代价
    pub aggregate_cost: f64,

    /// 调用约定转换节点的 CPU 代价
    pub converter_cost: f64,

    /// NATIVE 约定相对 ITERATOR 的 CPU 折扣
    pub native_cpu_factor: f64,

    /// COLUMNAR 约定相对 ITERATOR 的扫描 I/O 折扣
    pub columnar_io_factor: f64,
}

impl Default for CostModelConfig {
    fn default() -> Self {
        Self {
            scan_io_cost: 100.0,
            values_row_cost: 0.1,
            row_operator_cost: 1.0,
            join_cost: 10.0,
            aggregate_cost: 5.0,
            converter_cost: 0.5,
            native_cpu_factor: 0.5,
            columnar_io_factor: 0.5,
        }
    }
}

/// 默认代价模型
///
/// 逻辑约定（NONE）的节点与 `Subset` 占位节点代价为无穷大。
#[derive(Debug, Clone, Default)]
pub struct DefaultCostModel {
    config: CostModelConfig,
}

impl DefaultCostModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CostModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CostModelConfig {
        &self.config
    }

    fn base_cost(&self, operator: &Operator) -> Cost {
        let c = &self.config;
        match operator {
            Operator::Scan { .. } => Cost::new(c.row_operator_cost, c.scan_io_cost),
            Operator::Values { rows } => Cost::new(c.values_row_cost * (*rows).max(1) as f64, 0.0),
            Operator::Filter { .. } | Operator::Project { .. } | Operator::Union { .. } => {
                Cost::new(c.row_operator_cost, 0.0)
            }
            Operator::Join { .. } => Cost::new(c.join_cost, 0.0),
            Operator::Aggregate { .. } => Cost::new(c.aggregate_cost, 0.0),
            Operator::Converter { .. } => Cost::new(c.converter_cost, 0.0),
            Operator::Subset { .. } => Cost::infinite(),
        }
    }
}

impl CostModel for DefaultCostModel {
    fn cost(&self, node: &PlanNode) -> Cost {
        let convention = node.convention();
        if !convention.is_implementable() {
            return Cost::infinite();
        }

        let base = self.base_cost(node.operator());
        if base.is_infinite() || node.is_converter() {
            return base;
        }

        match convention {
            CallingConvention::Native => {
                Cost::new(base.cpu_cost * self.config.native_cpu_factor, base.io_cost)
            }
            CallingConvention::Columnar => {
                Cost::new(base.cpu_cost, base.io_cost * self.config.columnar_io_factor)
            }
            _ => base,
        }
    }
}
