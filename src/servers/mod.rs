// Modules for server components
pub mod room_socket;
pub mod web_ui;

// Re-export public APIs
pub use room_socket::{ClientMessage, RoomSocketServer, ServerMessage};
pub use web_ui::{AppState, WebUiConfig, WebUiServer};
