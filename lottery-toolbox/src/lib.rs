pub mod lottery;
pub mod utils;
