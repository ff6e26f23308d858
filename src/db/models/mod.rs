#![allow(unused_imports)]

//! Database models split into separate files.

pub mod event;
pub mod event_type;
pub mod game;
pub mod participant;
pub mod player;
pub mod sport;

pub use self::event::*;
pub use self::event_type::*;
pub use self::game::*;
pub use self::participant::*;
pub use self::player::*;
pub use self::sport::*;
