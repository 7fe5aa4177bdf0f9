pub mod account;
pub mod api;
pub mod chain;
pub mod config;
pub mod orchestrator;
pub mod quests;
pub mod tx;
pub mod workflow;
