//! Test-only crate. The scenarios live in `tests/`, driven through a
//! `MockChannel` answered by an in-memory AWS IoT Core.
