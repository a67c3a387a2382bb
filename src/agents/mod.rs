//! The message pipeline: validator, personality core and router.

pub mod personality;
pub mod router;
pub mod validator;

pub use personality::{Generation, PersonalityCore};
pub use router::{RouterReply, VexRouter};
pub use validator::{PassthroughValidator, Validator};
