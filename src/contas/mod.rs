pub mod docker;
pub mod error;
pub mod flags;
pub mod launcher;
pub mod meta;
pub mod plan;
pub mod profile;
pub mod steps;
pub mod templates;
pub mod utils;
