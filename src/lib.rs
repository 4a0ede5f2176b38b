pub mod core;
pub mod conversation;
pub mod llm;
pub mod session;

// HTTP surface
pub mod gateway;

// Process setup
pub mod logging;
pub mod persona;
