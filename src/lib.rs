pub use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use tera::Tera;

macro_rules! try_finish_task {
    ( $ctx:expr, $task:expr ) => {
        if let Some(ctx) = $ctx.as_mut() {
            ctx.finish($task);
        }
    };
}

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod paths;
pub mod regression;
pub mod table;

pub use error::MeasError;

lazy_static! {
    pub static ref TEMPLATES: Tera =
        match Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/*")) {
            Ok(t) => t,
            Err(e) => panic!("Error parsing templates: {e}"),
        };
}

#[cfg(test)]
mod tests;
