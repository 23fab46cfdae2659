pub mod export;
pub mod serve;
pub mod sweep;
