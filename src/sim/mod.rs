pub mod engine;
pub mod event;
pub mod level;
pub mod save;
pub mod session;
pub mod world;
