// Frameworks layer: runtime bootstrap, configuration and the headless participant.

pub mod config;
pub mod headless;
pub mod runner;
