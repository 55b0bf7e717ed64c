pub mod common;
mod external_tools;
mod pipeline;
