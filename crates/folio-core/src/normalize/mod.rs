//! Per-format conversion of parse results into canonical pages.

pub mod docx;
pub mod image;
pub mod numfmt;
pub mod pdf;
pub mod xlsx;
