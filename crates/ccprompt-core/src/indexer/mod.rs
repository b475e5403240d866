pub mod filesystem;
pub mod javascript;
pub mod parser;
pub mod pipeline;
pub mod python;
pub mod source;
