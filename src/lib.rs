//! Newsportal - a news publishing portal
//!
//! This library provides a server-rendered reader site and a JSON REST API
//! over the same set of services.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
pub mod web;
