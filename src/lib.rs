//! Ipgeo - Rate-Limited IP Geolocation Service
//!
//! This crate resolves IP addresses to a country and city from a dataset
//! loaded into memory at startup. Every API request first passes a
//! process-wide fixed-window rate limiter.

pub mod config;
pub mod error;
pub mod http;
pub mod lookup;
pub mod ratelimit;
