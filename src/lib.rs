pub mod config;
pub mod constants;
pub mod egdb;
pub mod game;
pub mod worker;
