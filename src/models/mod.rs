pub mod category;
pub mod recipe;
pub mod tag;
pub mod user;

pub use category::Category;
pub use recipe::{NewRecipe, Recipe};
pub use tag::Tag;
pub use user::{NewUser, User};
