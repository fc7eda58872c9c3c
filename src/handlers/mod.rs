pub mod campaign_handler;
pub mod import_handler;
pub mod report_handler;
pub mod tracking_handler;
