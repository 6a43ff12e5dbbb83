//! # image-ingest
//!
//! Upload ingestion with content sniffing and an image transform pipeline.
//! An upload is a byte buffer plus a file name. The file name only supplies
//! an extension for whitelisting; what the content *is* comes from its
//! leading bytes.
//!
//! # Architecture
//!
//! ```text
//! bytes + name ─► whitelist ─► signature ─┬─ image ─► imaging::pipeline ─┐
//!                                         └─ other ─► verbatim copy ─────┴─► storage ─► StoredArtifact
//! ```
//!
//! The pipeline is decode → resize → smooth → quantize → (JPEG baseline
//! re-encode) → final encode → atomic write. Each step is optional except
//! decode and the final encode, and the order is fixed.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`signature`] | Magic-byte table and content classification |
//! | [`imaging`] | Transform options, color math, resampling, codec backend, pipeline |
//! | [`naming`] | Stored file names and stored-path → web-path mapping |
//! | [`storage`] | [`ByteSink`](storage::ByteSink) seam, filesystem sink, stored artifacts |
//! | [`upload`] | The inbound operation: whitelist, sniff, route, persist |
//! | [`config`] | `image-ingest.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Sniff, Don't Trust
//!
//! A `.txt` upload whose bytes start with the PNG magic is an image and goes
//! through the pipeline. A `.jpg` that starts with `FF D8 FF` but does not
//! decode is an error; it is never stored verbatim as a fallback.
//!
//! ## Linear Light Is Not Brightness
//!
//! `linear_rgb` only changes the space resampling happens in. Brightening is
//! a separate `brightness_factor` (default 1.0).
//! [`LEGACY_LINEAR_BRIGHTNESS`](imaging::color::LEGACY_LINEAR_BRIGHTNESS)
//! reproduces the 10% boost older releases tied to linear processing.
//!
//! ## No Global State
//!
//! [`IngestConfig`](config::IngestConfig) is loaded once and handed to
//! [`Uploader::new`](upload::Uploader::new). The only process-wide data are
//! the signature table and color constants, both read-only.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod signature;
pub mod storage;
pub mod upload;
