//! 代价核心类型
//! 定义 Cost 结构体及其比较、累加规则

use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cost {
    pub cpu_cost: f64,
    pub io_cost: f64,
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            return write!(f, "Cost(inf)");
        }
        write!(
            f,
            "Cost(cpu={:.2}, io={:.2}, total={:.2})",
            self.cpu_cost,
            self.io_cost,
            self.total()
        )
    }
}

impl Default for Cost {
    fn default() -> Self {
        Self::zero()
    }
}

impl Cost {
    pub fn new(cpu: f64, io: f64) -> Self {
        Self {
            cpu_cost: cpu,
            io_cost: io,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// 不可实现的节点使用无穷大代价
    pub fn infinite() -> Self {
        Self::new(f64::INFINITY, f64::INFINITY)
    }

    pub fn total(&self) -> f64 {
        self.cpu_cost + self.io_cost
    }

    pub fn is_zero(&self) -> bool {
        self.cpu_cost == 0.0 && self.io_cost == 0.0
    }

    pub fn is_infinite(&self) -> bool {
        !self.total().is_finite()
    }

    /// 严格小于另一代价
    pub fn is_lt(&self, other: &Cost) -> bool {
        self.total() < other.total()
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost::new(self.cpu_cost + rhs.cpu_cost, self.io_cost + rhs.io_cost)
    }
}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.total().partial_cmp(&other.total())
    }
}
