pub mod clock;
pub mod config;
pub mod logging;
pub mod release;
pub mod scraper;
pub mod store;
pub mod watch;
