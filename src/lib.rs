//! Nexus toolkit - small system utilities behind one command line
//!
//! The centrepiece is the file janitor: it sorts the files of a directory into
//! category folders by extension. Alongside it sit a CPU/RAM load monitor and
//! a one-shot weather lookup.

pub mod category;
pub mod cli;
pub mod config;
pub mod monitor;
pub mod organizer;
pub mod output;
pub mod weather;

pub use category::{Category, CategoryTable};
pub use config::{CompiledFilters, ConfigError, JanitorConfig};
pub use organizer::{
    CollisionPolicy, OrganizeError, OrganizeReport, Organizer, ScannedFile, SkipReason, organize,
};

pub use cli::{Cli, run_cli};
