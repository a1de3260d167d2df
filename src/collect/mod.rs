pub mod eia;
pub mod global_variables;
