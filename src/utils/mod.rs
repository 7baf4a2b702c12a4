// src/utils/mod.rs

pub mod cooldown;
pub mod csv;
pub mod guards;
pub mod hash;
pub mod jwt;
pub mod scoring;
