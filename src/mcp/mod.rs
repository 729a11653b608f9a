// Model Context Protocol surface

pub mod server;
pub mod tools;
