pub mod html;
pub mod sql;
