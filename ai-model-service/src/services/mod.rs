//! Concrete HTTP clients for the Ark API.

pub mod ark_service;
