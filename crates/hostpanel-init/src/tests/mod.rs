//! Test suites for the request initializer.

pub(crate) mod support;
