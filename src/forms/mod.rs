pub mod register;

pub use register::RegisterForm;
