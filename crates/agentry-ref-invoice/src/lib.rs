//! # agentry-ref-invoice
//!
//! Invoice-processing reference runtime for the agentry orchestration core.
//!
//! Demonstrates two scenarios using mock data and scripted models:
//!
//! 1. **Invoice Pipeline**: an agent driven by the fenced JSON action
//!    language extracts an invoice through the `"fast"` model tier, stores
//!    it, lists what is stored and terminates. One malformed reply shows the
//!    loop feeding parse errors back instead of aborting.
//! 2. **Staged Ledger**: an agent driven by structured tool calls stages
//!    ledger postings for review, then commits them. A second batch exceeds
//!    the payment limit, so its commit rolls the earlier postings back.
//!
//! All data is hardcoded and fictional. No external API calls are made.

pub mod ledger;
pub mod mock_data;
pub mod model;
pub mod scenarios;
pub mod tools;
