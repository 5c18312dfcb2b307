//! Crate-level tests

pub(crate) mod support;
