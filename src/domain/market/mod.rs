pub mod history;
pub mod reference;

pub use history::{FxHistory, MarketHistory};
pub use reference::{Exchange, SecurityListing, SecurityMaster};
