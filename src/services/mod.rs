pub mod room_manager;
pub mod session_manager;

pub use room_manager::{RoomAction, RoomError, RoomJoined, RoomManager, DEFAULT_ROOM};
pub use session_manager::{new_session_id, SessionManager};
