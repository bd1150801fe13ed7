pub mod operator;
pub mod surface;
