pub mod api;
pub mod client;
pub mod conditions;
pub mod controllers;
pub mod converge;
pub mod probe;
pub mod resources;
pub mod util;

#[cfg(test)]
pub mod fixtures;
