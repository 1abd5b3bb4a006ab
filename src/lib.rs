pub mod ammo;
pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod logging;
pub mod pacer;
pub mod pool;
pub mod run;
pub mod shutdown;
pub mod source;
pub mod worker;
