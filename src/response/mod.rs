pub mod assembler;
pub mod notifier;
pub mod res;
