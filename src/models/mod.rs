mod card;
mod session;
mod tag;

pub use card::{Card, CardPatch, CardType};
pub use session::{Session, User};
pub use tag::{random_color, Tag};
