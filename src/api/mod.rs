//! Typed calls for the console's authentication endpoints.
//!
//! All of these paths are whitelisted: they never carry a bearer token and a
//! 401 from them is reported to the caller instead of starting a refresh.

mod auth;

pub const SIGN_IN_PATH: &str = "/auth/sign-in";
pub const REGISTER_PATH: &str = "/auth/register";
pub const OTP_PATH: &str = "/auth/otp";
