pub mod config;
pub mod error;
pub mod job;
pub mod media;
pub mod selection;
pub mod time;


pub use config::*;
pub use error::*;
pub use job::*;
pub use media::*;
pub use selection::*;
pub use time::*;
