//! # hybridfs-entity
//!
//! Domain entity models for HybridFS. Every struct in this crate
//! represents a database table row or a domain value object. Database
//! entities derive `sqlx::FromRow`; the category and location enums map
//! to PostgreSQL enum types.

pub mod file;
pub mod folder;
