pub mod dynamic_threshold;
pub mod iqr;
pub mod local_regression;
pub mod mad;
pub mod static_threshold;
