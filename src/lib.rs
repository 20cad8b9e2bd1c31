#![forbid(unsafe_code)]

//! Downloader for EFAS historical river discharge data from the Copernicus
//! Climate Data Store (CDS).
//!
//! You express a CDS request (keyword/value pairs), submit it through a small
//! blocking client that speaks the CDS task protocol (submit, poll until the
//! queued job settles, download the result), and results are cached on disk:
//! a year whose output file already exists is never re-fetched.
//!
//! **Quick start**
//! ```no_run
//! use std::path::Path;
//! use efas_discharge::{discharge, CdsClient};
//!
//! let client = CdsClient::from_env()?; // CDSAPI_URL/CDSAPI_KEY or ~/.cdsapirc
//! if let Some(result) = discharge::retrieve_full(&client, 2019, Path::new("."))? {
//!     println!("{} bytes -> {}", result.size_bytes, result.target.display());
//! }
//! # Ok::<(), efas_discharge::Error>(())
//! ```
//!
//! Notes:
//! - Downloads are governed by the CDS terms of use for the EFAS dataset.
//! - Full-domain files run to several gigabytes per year; see
//!   [`discharge::cropped_request`] for why the smaller cropped path is
//!   currently not used.

pub mod client;
pub mod config;
pub mod discharge;
mod error;
mod request;

pub use crate::client::{CdsClient, ClientOptions, DataClient, Retrieved};
pub use crate::config::Credentials;
pub use crate::error::{Error, Result};
pub use crate::request::{Request, RequestValue};
