//! Core types, ports and services for the Criador breeder registry.
//!
//! This crate has no HTTP or database dependencies. The onboarding
//! orchestrator and the animal lifecycle manager live here and talk to
//! storage, attachments and email only through the traits in [`store`].

// Port implementations use native `async fn`; the traits state the `Send`
// bounds on their futures explicitly.
#![allow(async_fn_in_trait)]

pub mod animal;
pub mod animals;
pub mod breeder;
pub mod error;
pub mod identity;
pub mod onboarding;
pub mod price;
pub mod profiles;
pub mod store;
pub mod validation;

#[cfg(test)]
mod testing;

pub use error::{BoxError, Error, Result};
