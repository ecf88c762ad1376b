//! # Feature: Lunar Calendar
//!
//! Traditional lunar calendar for 1900-2100: encoded year table, solar/lunar
//! conversion, and display labels.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Extended table through 2100, traditional labels
//! - 1.0.0: Initial release with conversion for 1900-2049

pub mod converter;
pub mod label;
pub mod table;

pub use converter::{lunar_to_solar, lunar_to_solar_checked, solar_to_lunar, LunarDate};
pub use table::{
    days_in_month, leap_month_index, leap_month_length, month_length, year_length, MAX_YEAR,
    MIN_YEAR,
};
