pub mod aggregate;
pub mod args;
mod backup;
pub mod calc;
pub mod commands;
mod config;
mod error;
pub mod model;
pub mod normalize;
pub mod schema;
mod utils;


pub use config::Config;
pub use error::BudgetError;
pub use error::Error;
pub use error::Result;
