pub mod advantage;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod data_fetcher;
pub mod error;
pub mod history;
pub mod logging;
pub mod mailer;
pub mod output;
pub mod report;
