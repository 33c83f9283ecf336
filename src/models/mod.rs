pub mod enums;
pub mod patient;
pub mod stroke;
pub mod user;

pub use patient::*;
pub use stroke::*;
pub use user::*;
