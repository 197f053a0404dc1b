use rust_decimal::Decimal;
use std::fmt::Debug;

/// Commission schedule applied by the simulated brokerage when it fills
/// an order. The fill carries the resulting commission; strategies never
/// see the model itself.
pub trait FeeModel: Debug + Send + Sync {
    fn commission(&self, quantity: i64, price: Decimal) -> Decimal;

    /// Human-readable description of the schedule.
    fn description(&self) -> String;
}

/// Flat per-share commission with an optional minimum per order.
#[derive(Debug, Clone)]
pub struct PerShareFeeModel {
    pub per_share: Decimal,
    pub minimum: Decimal,
}

impl PerShareFeeModel {
    pub fn new(per_share: Decimal, minimum: Decimal) -> Self {
        Self { per_share, minimum }
    }

    /// Commission-free schedule.
    pub fn free() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO)
    }
}

impl FeeModel for PerShareFeeModel {
    fn commission(&self, quantity: i64, _price: Decimal) -> Decimal {
        let commission = Decimal::from(quantity.unsigned_abs()) * self.per_share;
        commission.max(self.minimum)
    }

    fn description(&self) -> String {
        format!(
            "Per-share fee model ({}/share, min {})",
            self.per_share, self.minimum
        )
    }
}

/// Commission as a fraction of traded notional.
#[derive(Debug, Clone)]
pub struct BasisPointFeeModel {
    pub rate: Decimal,
}

impl BasisPointFeeModel {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }
}

impl FeeModel for BasisPointFeeModel {
    fn commission(&self, quantity: i64, price: Decimal) -> Decimal {
        Decimal::from(quantity.unsigned_abs()) * price * self.rate
    }

    fn description(&self) -> String {
        format!("Notional fee model ({:.4}% of traded value)", self.rate * Decimal::from(100))
    }
}
