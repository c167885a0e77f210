/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Viewer event names and payload builders.
pub mod notifications;
/// Server-Sent Events viewer streams.
pub mod sse_service;
/// Moderator operations on the tournament.
pub mod tournament_service;
/// WebSocket viewer connections.
pub mod websocket_service;
