//! Layout geometry and the canvas it is painted onto.

pub mod canvas;
pub mod layout;
