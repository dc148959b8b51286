//! Load/store unit tests.
