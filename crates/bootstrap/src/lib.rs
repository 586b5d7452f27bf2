//! First-run initialization of a fresh deployment.
//!
//! Flow: detect → validate admin spec → ensure company → ensure admin → write flag.
//!
//! The relational store is the source of truth for "is this system
//! initialized"; the flag record written at the end is only a fast path.

pub mod admin;
pub mod detect;
pub mod error;
pub mod flag;
pub mod password;
pub mod service;
pub mod state;
pub mod verify;

pub use {
    admin::{AdminSpec, ValidAdmin},
    detect::{InitReport, InitSource, check_initialized},
    error::{Error, Result},
    flag::{FileFlagStore, FlagAdmin, FlagRecord, FlagStore},
    service::{
        AdminAction, AdminSummary, BootstrapSettings, Bootstrapper, CompanyAction,
        CompanySummary, EnsuredCompany, InitOutcome, QuickInitOutcome, ReinitOutcome,
    },
    state::SystemState,
    verify::{VerifyReport, verify_admin},
};
