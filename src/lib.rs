pub mod agent;
pub mod data;
pub mod demand;
pub mod error;
pub mod eval;
pub mod gym;
pub mod io;
mod macros;
pub mod predictor;
pub mod prelude;
pub mod quote;
pub mod report;
pub mod surge;
pub mod train;

pub use io::{SerdeFormat, StorageLocation};
