pub mod simulator;
pub mod tearsheet;

pub use simulator::Simulator;
pub use tearsheet::{Tearsheet, TearsheetBuilder};
