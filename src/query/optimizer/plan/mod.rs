//! 备忘录表示模块
//! 提供代价优化过程中的等价组、组内表达式与备忘录

pub mod group;
pub mod memo;
pub mod node;

pub use group::{OptGroup, OptimizationPhase};
pub use memo::Memo;
pub use node::{OptGroupNode, SubsetRef};
