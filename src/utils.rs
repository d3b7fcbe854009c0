pub mod clonecell;
pub mod copyhashmap;
pub mod errorfmt;
pub mod geometric_decay;
pub mod numcell;
