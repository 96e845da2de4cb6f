pub mod dataset;
pub mod domain;
pub mod ride;
pub mod synthetic;
