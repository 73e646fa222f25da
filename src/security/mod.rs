//! Security primitives shared by the authentication schemes.

pub mod timing_protection;
