pub mod api;
pub mod boundary;
pub mod cli;
pub mod config;
pub mod error;
pub mod likes;
pub mod listing;
pub mod models;
pub mod notice;
pub mod pages;
pub mod rating;
pub mod search;
pub mod session;
