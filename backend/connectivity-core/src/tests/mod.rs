mod bridge;
mod classify;
mod config;
mod observability;
mod registry;
mod retry;
mod subscribers;
mod support;
