// src/blockchain/services/mod.rs

pub mod balance;
pub mod routes;
pub mod token;
pub mod transactions;
