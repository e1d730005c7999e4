//! Skill graphs, the progression state machine, and repository trait
//! definitions for Skillpath.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements. It depends only on `skillpath-types` -- never on
//! `skillpath-infra` or any database/IO crate.

pub mod achievement;
pub mod event;
pub mod graph;
pub mod progression;
pub mod recommend;
pub mod repository;
pub mod retry;
pub mod service;
