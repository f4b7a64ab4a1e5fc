//! End-to-end tests: sessions driven across several days against the local
//! adapters, and the HTTP API on top of them.

mod common;
mod cycles;
mod http;
mod sqlite;
