pub mod recipe;
pub mod tag;

pub use recipe::{RecipeInput, RecipeRepresentation, ValidatedRecipe};
pub use tag::TagRepresentation;
