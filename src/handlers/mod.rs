pub mod application;
pub mod like;
pub mod message;
pub mod notification;
pub mod router;
pub mod traits;

pub use router::ChangeRouter;
pub use traits::ChangeHandler;
