pub mod image;
pub mod multipart;
