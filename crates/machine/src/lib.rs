mod access;
mod effects;
mod machine;
mod restock;
mod scheduler;
mod stock;

pub use access::*;
pub use effects::*;
pub use machine::*;
pub use restock::*;
pub use scheduler::*;
pub use stock::*;
