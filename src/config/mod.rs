pub mod campaign_config;
