// src/handlers/mod.rs

pub mod auth;
pub mod companies;
pub mod exports;
pub mod members;
pub mod notifications;
pub mod quizzes;
pub mod stats;
pub mod users;
