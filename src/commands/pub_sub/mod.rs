mod publish;
mod subscribe;
mod unsubscribe;

pub use publish::{publish, publish_with_state};
pub use subscribe::subscribe;
pub use unsubscribe::unsubscribe;
