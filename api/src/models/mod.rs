mod category;
mod interaction;
mod post;
mod profile;

pub use category::Category;
pub use interaction::InteractionKind;
pub use post::{Answer, Author, Post};
pub use profile::{ActivityStats, Profile, UserAnswer};
