pub mod app;
pub mod core;
pub mod model;
pub mod queue;
pub mod relay;
