pub mod api;
pub mod calendar;
pub mod cli;
pub mod client;
pub mod core;
pub mod explore;
pub mod favorites;
pub mod geo;
pub mod map;
pub mod time_window;
