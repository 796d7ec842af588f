// Publication module - the submission pipeline and its delivery ports.

pub mod delivery;
pub mod publication_service;
pub mod publish_action;

pub use delivery::*;
pub use publication_service::*;
pub use publish_action::*;
