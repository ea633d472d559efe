//! UCI (Universal Chess Interface) protocol library, client side.
//!
//! This crate provides the commands a GUI or analysis driver sends to a UCI
//! engine, and parsing for the lines the engine writes back.
//!
//! # Commands sent to the engine
//!
//! - `uci` - Initialize engine, get id and options
//! - `setoption name <id> [value <x>]` - Configure the engine
//! - `isready` / `readyok` - Synchronization
//! - `ucinewgame` - Reset engine state between games
//! - `position startpos|fen <fen> [moves <move>...]` - Set position
//! - `go [depth <d>] [movetime <ms>]` - Start search
//! - `stop` - Stop search
//! - `quit` - Exit engine
//!
//! # Engine output
//!
//! [`EngineMessage::parse`] turns a single output line into a typed message.
//! Search progress arrives as [`EngineInfo`], including the `multipv` rank
//! used when the engine reports several lines at once.

mod command;
mod info;
mod message;

pub use command::{GoOptions, GuiCommand};
pub use info::{Bound, EngineInfo, Score};
pub use message::EngineMessage;
