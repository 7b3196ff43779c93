pub mod encoding;
pub mod html;
