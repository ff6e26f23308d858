pub mod event;
pub mod event_type;
pub mod game;
pub mod participant;
pub mod player;
pub mod sport;

pub use event::EventRepository;
pub use event_type::EventTypeRepository;
pub use game::GameRepository;
pub use participant::ParticipantRepository;
pub use player::PlayerRepository;
pub use sport::SportRepository;
