pub mod events;
pub mod runner;


pub use events::JobEvent;
pub use runner::TrimJobRunner;
