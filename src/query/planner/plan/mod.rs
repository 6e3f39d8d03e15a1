pub mod convention;
pub mod expr;
pub mod node;

pub use convention::CallingConvention;
pub use expr::{BinaryOp, Expr, Literal, NamedExpr};
pub use node::{JoinKind, Operator, PlanNode};
