mod event_bridge;
mod helpers;
mod http_client;
mod socket_manager;
mod token_provider;
mod ws_transport;
