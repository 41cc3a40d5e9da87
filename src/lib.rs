//! Thermal-wave analysis (TWA) toolkit.
//!
//! ```text
//!  instrument .txt
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  parser   │  text → RawData (phase unwrapped)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐      ┌──────────────┐
//!   │ analyzer  │ ◀──▶ │ RangeSelector │  drag / click → recompute
//!   └──────────┘      └──────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ persist   │  results.json, input_data.json, raw_data.txt (+ PNGs)
//!   └──────────┘
//! ```

pub mod analysis;
pub mod app;
pub mod batch;
pub mod config;
pub mod data;
pub mod error;
pub mod persist;
pub mod report;
pub mod state;
pub mod summary;
pub mod ui;
