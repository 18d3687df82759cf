pub mod execute;
pub mod health;
