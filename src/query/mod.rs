// Definition resolution and read-only queries

pub mod definitions;
pub mod engine;
pub mod resolver;
