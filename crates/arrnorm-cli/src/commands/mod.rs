pub mod normalize;
pub mod register;
