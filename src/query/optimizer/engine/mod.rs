//! 优化引擎模块
//! 提供代价优化器的核心引擎实现

pub mod exploration;
pub mod optimizer;

pub use exploration::ExplorationState;
pub use optimizer::{CostBasedPlanner, OptimizerStats};
