//! Terminal world map for picking countries and looking up their population
//! over REST (one request per country) or GraphQL (one batched query).

pub mod app;
pub mod braille;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod map;
pub mod ui;
pub mod workflow;
