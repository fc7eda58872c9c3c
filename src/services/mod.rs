pub mod campaign_service;
pub mod contact_service;
pub mod delivery_service;
pub mod import_service;
pub mod mailer;
pub mod recipient_service;
pub mod report_service;
pub mod scheduler_service;
pub mod task_queue;
pub mod tracking_service;
