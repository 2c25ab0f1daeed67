mod controls;
mod details;
pub(in crate::app) mod form;
mod panels;
