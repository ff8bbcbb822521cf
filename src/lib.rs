//! Local job matching: store postings and a skill profile, then rank the
//! postings by how well they fit the profile.

pub mod config;
pub mod db;
pub mod import;
pub mod models;
pub mod ranker;
pub mod scorer;
pub mod tui;
