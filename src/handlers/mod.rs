//! HTTP handlers for the generic entity views.

pub mod entity;
