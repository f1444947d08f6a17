pub mod generator;
pub mod resolver;
pub mod store;

pub use resolver::DataResolver;
pub use store::{DataValue, TestData};
