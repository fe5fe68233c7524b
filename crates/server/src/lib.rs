//! HTTP service for used-vehicle price prediction

pub mod api;
pub mod config;
