pub mod aggregate;
pub mod calendar;
pub mod db;
pub mod engine;
pub mod history;
pub mod leaderboard;
pub mod models;
pub mod service;
pub mod streak;
