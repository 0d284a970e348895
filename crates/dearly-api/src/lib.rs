pub mod access;
pub mod audio;
pub mod auth;
pub mod error;
pub mod games;
pub mod middleware;
pub mod notifications;
pub mod receivers;
pub mod routes;
pub mod users;
pub mod viewed_rewards;
