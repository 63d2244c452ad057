pub mod bootstrap;
pub mod config;
pub mod db;
pub mod export;
pub mod llm_clients;
pub mod security;
pub mod spreadsheet;
pub mod storage;
