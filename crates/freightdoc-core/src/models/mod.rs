//! Data models shared by the extractors and their callers.

pub mod config;
pub mod contract;
pub mod inspection;
pub mod workbook;
