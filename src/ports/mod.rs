//! Port traits at the I/O seams.

pub mod config_port;
pub mod fundamentals_port;
pub mod quote_port;
pub mod macro_port;
pub mod llm_port;
pub mod page_port;
