//! Request middleware

mod gate;

pub use gate::{admission, AuthContext};
