pub mod authors;
pub mod recipes;
pub mod tags;
