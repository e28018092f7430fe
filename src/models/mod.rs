pub mod proposal;
pub mod reputation;
pub mod translation;
