use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod classifier;
pub mod common;
pub mod payload;
pub mod reader;
pub mod validator;

#[cfg(test)]
mod testing;
