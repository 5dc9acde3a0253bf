pub mod client;
pub mod config;
pub mod model;
pub mod persona;
pub mod resource;

// Diagnosis and event timelines
pub mod doctor;
pub mod events;

// Fetchers over a cluster client
pub mod fetch;

// Dashboard state machine and tab text
pub mod dashboard;
pub mod text;

// In-memory cluster for tests and demo mode
pub mod fake;
