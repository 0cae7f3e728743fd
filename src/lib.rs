//! Bazaar flip tracker: prices crafting flips on the Hypixel SkyBlock bazaar
//! and ranks them by profit.

pub mod app;
pub mod config;
pub mod domain;
pub mod infra;
pub mod ui;
pub mod util;
