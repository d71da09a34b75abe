pub mod account;
pub mod animals;
pub mod breeders;
