pub mod comment;
pub mod response;
