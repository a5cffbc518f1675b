//! Networm game server library.
//!
//! A tick-driven world of worms and snacks, shared over length-prefixed TCP.

pub mod collision;
pub mod config;
pub mod entity;
pub mod movement;
pub mod server;
pub mod world;

pub use config::Config;
pub use server::{run, Server, ShutdownHandle};
pub use world::{World, WorldBorder};
