// src/recipe/mod.rs

//! ROM build recipes
//!
//! Recipes are published by each arcade core's repository as
//! `releases/build_rom.ini` and name the MAME archive they apply to, the
//! member files to concatenate and the MD5 of the finished image.
//!
//! # Example Recipe
//!
//! ```text
//! zip=dkong.zip
//! ifiles=(c_5et_g.bin c_5ct_g.bin c_5bt_g.bin c_5at_g.bin)
//! ofile=a.dkong.rom
//! ofileMd5sumValid=...
//! ```

mod format;
pub mod parser;

pub use format::{InputSpec, Recipe};
pub use parser::{parse_input_list, parse_recipe};
