pub mod campaign_model;
pub mod contact_model;
pub mod delivery_log_model;
pub mod import_model;
pub mod recipient_model;
