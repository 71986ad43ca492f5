pub mod campaign;
pub mod product;
pub mod score;
pub mod subscription;
pub mod task;
