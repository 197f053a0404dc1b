pub mod drawdown;
pub mod ratios;
pub mod returns;

pub use drawdown::{DrawdownReport, drawdowns};
pub use ratios::{
    DEFAULT_TRADING_DAYS, alpha, annualized_return, annualized_volatility, beta, cagr,
    downside_deviation, information_ratio, sharpe, sortino, volatility,
};
pub use returns::{RETURN_SCALE, Variance, covariance, daily_returns, equity_curve, mean, std_dev, variance};
