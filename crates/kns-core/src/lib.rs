pub mod approval;
pub mod error;
pub mod group;
pub mod io;
pub mod notification;
pub mod paths;
pub mod profile;
pub mod settings;
pub mod skill;
pub mod types;
pub mod workspace;

pub use error::{KnsError, Result};
