//! 核心类型模块
//! 提供优化器所需的核心数据类型，包括代价与代价模型

pub mod cost;
pub mod cost_model;

pub use cost::Cost;
pub use cost_model::{CostModel, CostModelConfig, DefaultCostModel};
