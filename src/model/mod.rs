//! Core identifier types for chunkcas

mod id;

pub use id::ContentId;
