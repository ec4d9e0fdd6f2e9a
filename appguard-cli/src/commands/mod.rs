pub mod inspect;
pub mod token;
pub mod verify_chain;
