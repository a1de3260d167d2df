pub mod eia_collect;
