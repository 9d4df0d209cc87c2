pub mod actor;
pub mod film_school;
pub mod image;
pub mod project;
