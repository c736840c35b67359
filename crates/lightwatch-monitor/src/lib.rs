// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Lightwatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Power outage monitor: polls a device, records its online state and posts
//! alerts when power goes away or comes back.

pub mod alerts;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod monitor;
pub mod notifications;
pub mod signer;
pub mod status;
pub mod token;

pub use alerts::{AlertFormatter, Language, format_duration};
pub use config::MonitorConfig;
pub use db::{StateStore, StatusRecord};
pub use error::{MonitorError, MonitorResult};
pub use monitor::{
    Clock, Monitor, MonitorSettings, RetryPolicy, SystemClock, TickOutcome, wait_for_shutdown,
};
pub use notifications::{Notifier, notifier_from_config};
pub use status::{StatusSource, status_source_from_config};
