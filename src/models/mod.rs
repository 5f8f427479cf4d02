// src/models/mod.rs

pub mod lesson;
pub mod progress;
pub mod question;
pub mod session;
pub mod user;
