//! A small Rust client for ERDDAP scientific data servers.
//!
//! This crate implements an `erddapy`-style flow:
//! describe the dataset request, fetch it over the griddap or tabledap
//! protocol, and get the result back as an in-memory grid or table.
//!
//! ## Quick start
//! - Call [`get_erddap_data`] with a server URL, dataset ID and protocol.
//!   It absorbs all failures, retries transient ones, and returns `None`
//!   when no data could be fetched.
//! - For structured errors, build a [`FetchRequest`] and call
//!   [`Client::fetch`] directly.
//!
//! ```no_run
//! use erddapy::{ErddapData, get_erddap_data};
//!
//! fn main() {
//!     let constraints = [
//!         ("cast_start_time>=", "2022-01-01T00:00:00Z"),
//!         ("cast_start_time<=", "2022-12-31T23:59:59Z"),
//!     ];
//!     let variables = ["sea_water_temperature", "sea_water_practical_salinity"];
//!
//!     let data = get_erddap_data(
//!         "https://nwem.apl.washington.edu/erddap",
//!         "orca1_L2_gridded_025",
//!         "griddap",
//!         Some(&variables),
//!         Some(&constraints),
//!         5,
//!     );
//!
//!     if let Some(ErddapData::Grid(grid)) = data {
//!         println!("grid shape: {:?}", grid.shape());
//!     }
//! }
//! ```
//!
//! For full usage and configuration details, see the crate README.

#![forbid(unsafe_code)]

mod client;
mod config;
mod data;
mod error;
mod fetch;
mod metadata;
mod protocol;
mod request;
mod util;

pub use client::{Client, ClientConfig};
pub use data::{Column, DataValue, ErddapData, GridAxis, GridDataset, GridVariable, Table};
pub use fetch::{
    DEFAULT_MAX_RETRIES, RETRY_DELAY, fetch_with_retries, get_erddap_data, retry_with_delay,
};
pub use protocol::Protocol;
pub use request::FetchRequest;
