//! Application services: recipe access, search, edits and the text tool
//! surface.

pub mod editing;
pub mod error;
pub mod recipes;
pub mod search;
pub mod tools;
