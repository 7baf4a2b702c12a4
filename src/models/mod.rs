// src/models/mod.rs

pub mod attempt;
pub mod company;
pub mod notification;
pub mod quiz;
pub mod user;
