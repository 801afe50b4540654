pub mod compile;
pub mod serve;
