pub mod deposits;
