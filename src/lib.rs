//! xlsxdeck - Pure-Rust transcription of Excel table regions into PowerPoint tables
//!
//! This crate finds titled table regions in Excel workbooks (XLSX), delimited by a
//! title row and an end-marker row, and inserts each of them into a PowerPoint
//! template (PPTX) as a native table. Fills, fonts, alignment, borders, merged cells
//! and column widths are carried over, and cell text is rendered for the formats
//! `mmm-yy`, `0%`, `#,##0` and `General`.
//!
//! Sheets are named `"<region> - MOIS"` (month) or `"<region> - YTD"` (year to date).
//! One presentation is written per region, named `<region><suffix>.pptx`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use xlsxdeck::{ConverterBuilder, DeckConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load the JSON configuration
//!     let config = DeckConfig::from_path("deck.json")?;
//!     config.validate()?;
//!
//!     let converter = ConverterBuilder::new().with_config(&config).build()?;
//!
//!     // Extract every table, fill the template per region and write the decks
//!     let report = converter.convert_into_folder(
//!         File::open(&config.excel_file)?,
//!         File::open(&config.ppt_file)?,
//!         &config.output_folder,
//!     )?;
//!
//!     for path in &report.written {
//!         println!("{}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # In-memory rendering
//!
//! ```rust,no_run
//! use std::io::Cursor;
//! use xlsxdeck::{ConverterBuilder, Position, TableConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = ConverterBuilder::new()
//!     .with_tables(vec![TableConfig {
//!         title: "Revenue".to_string(),
//!         slide_month: 1,
//!         slide_ytd: 2,
//!         text_size: 9,
//!         position: Position { x: 36.0, y: 72.0, width: 640.0, height: 200.0 },
//!     }])
//!     .build()?;
//!
//! let excel_data: Vec<u8> = vec![]; // Your Excel file bytes
//! let template: Vec<u8> = vec![]; // Your PowerPoint template bytes
//!
//! let workbook = converter.extract(Cursor::new(excel_data))?;
//! for deck in converter.render_decks(&workbook, &template)? {
//!     println!("{}: {} bytes", deck.file_name, deck.bytes.len());
//! }
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod error;
mod format;
mod formatter;
mod grid;
mod output;
mod parser;
mod region;
mod security;
mod style;
mod transcribe;
mod translate;
mod types;

// 公開API
pub use api::{DeckConfig, Position, TableConfig, DEFAULT_END_MARKER, DEFAULT_TEXT_SIZE};
pub use builder::{Converter, ConverterBuilder, RenderedDeck, RunReport, SkippedTable};
pub use error::XlsxDeckError;
pub use region::{PeriodKind, Region, RegionDataSet, Workbook};
pub use types::{CellCoord, CellRange};
