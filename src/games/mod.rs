//! The four arcade games
//!
//! Each game is a [`Game`](crate::sim::Game) strategy: its own input
//! vocabulary, motion, spawn policy and scoring, run by the shared engine.

pub mod car;
pub mod dragon;
pub mod paddle;
pub mod snake;

pub use car::{Car, CarInput};
pub use dragon::{Dragon, DragonInput};
pub use paddle::{Paddle, PaddleInput};
pub use snake::{Direction, Snake};
