// WebSocket module - organized into focused submodules
//
// - handler: WebSocket upgrade handler (entry point)
// - connection: Main WebSocket connection handling logic
// - batching: Message batching for performance optimization
// - sending: Message serialization and sending functions
// - routes: HTTP route setup (health, metrics)

mod batching;
mod connection;
mod handler;
mod routes;
mod sending;

pub use handler::websocket_handler;
pub use routes::create_router;
