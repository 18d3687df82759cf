//! `sandrun-core` -- request validation and sandboxed script execution.
//!
//! Pure domain logic with no HTTP concerns. The API crate calls
//! [`validation::validate_request`] and hands the result to a
//! [`scripting::executor::ScriptRunner`].

pub mod scripting;
pub mod validation;
