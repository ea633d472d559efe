//! Chess opening classification.
//!
//! This crate maps board positions to named openings. A reference database
//! of opening lines (PGN with `ECO`, `Opening` and `Variation` tags) is
//! replayed once into an [`OpeningBook`], keyed by the [`Fingerprint`] of the
//! position each line ends in. Classifying a position is then a single hash
//! lookup.
//!
//! Lookups are exact: a transposition into a known position is recognised,
//! but a position the reference never reaches classifies as "no opening".
//!
//! The [`pgn`] module is shared with the analysis pipeline: it reads the
//! mainline of a PGN game and replays it into a sequence of positions.

pub mod database;
pub mod fingerprint;
pub mod opening;
pub mod pgn;

pub use database::{OpeningBook, OpeningBookError};
pub use fingerprint::{Fingerprint, FingerprintError};
pub use opening::OpeningEntry;
pub use pgn::{Games, Mainline, PgnError, Ply, ReplayError};
