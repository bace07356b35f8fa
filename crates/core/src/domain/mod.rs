pub mod catalog;
pub mod contract;
pub mod error;
pub mod report;
