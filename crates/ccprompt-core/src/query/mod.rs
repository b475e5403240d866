pub mod context;
pub mod guards;
pub mod inheritance;
