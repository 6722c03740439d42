use std::error::Error;

pub mod api;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod handler;
pub mod marker;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod store;
pub mod view;

pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
