// src/quiz/mod.rs

//! Daily quiz engine: question synthesis, grading and the XP award.

pub mod generator;
pub mod scorer;
pub mod service;
