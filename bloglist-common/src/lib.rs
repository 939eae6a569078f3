pub mod credential;
pub mod model;
pub mod ranking;
pub mod snowflake;
pub mod token;
pub mod util;
