//! Output generation for the per-day Markdown digests.
//!
//! # Submodules
//!
//! - [`markdown`]: Renders stored papers into one digest per
//!   `(category, date)` pair and writes it to the output directory
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── cs.CV_2025-08-25.md
//! ├── cs.AI_2025-08-25.md
//! └── papers.db
//! ```

pub mod markdown;
