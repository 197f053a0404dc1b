pub mod allocation;
pub mod fees;
pub mod portfolio;
pub mod sizing;
pub mod strategy;

pub use allocation::{CapitalAllocator, EqualSplitAllocator, SelfFundedAllocator};
pub use fees::{BasisPointFeeModel, FeeModel, PerShareFeeModel};
pub use portfolio::{Portfolio, SplitRounding};
pub use sizing::{CloseOrderPricer, EqualWeightSizer, LimitOrderPricer, OrderPricer, PositionSizer};
pub use strategy::{BuyAndHold, RebalancingBuyAndHold, SignalModel, Strategy};
